pub mod score_records;

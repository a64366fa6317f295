use bpmon_catalog::grades::GradeTable;
use bpmon_model::score::percentage;

/// Letter grade for `score` out of `max_score`. Nothing achievable grades lowest.
pub fn grade_for(table: &GradeTable, score: i64, max_score: i64) -> String {
    if max_score <= 0 {
        return table.lowest().to_string();
    }
    let percentage = percentage(score, max_score);
    table
        .ranges()
        .iter()
        .find(|range| range.contains(percentage))
        .map_or_else(|| table.lowest(), |range| range.grade.as_str())
        .to_string()
}

pub mod helpers;

pub use helpers::{inc_int_counter_vec, set_int_gauge_vec, start_timer_vec, stop_timer};
use helpers::{
    CYCLE_TIME_BUCKETS, create_histogram_vec, create_int_counter_vec, create_int_gauge_vec,
};
use prometheus_exporter::prometheus::{HistogramVec, IntCounterVec, IntGaugeVec};

lazy_static::lazy_static! {
    pub static ref SCORING_CYCLE_TIME: HistogramVec = create_histogram_vec(
        "scoring_cycle_time",
        "Duration of one scoring pass over a chain",
        CYCLE_TIME_BUCKETS,
        &["chain"]
    );

    pub static ref SUBJECTS_SCORED: IntGaugeVec = create_int_gauge_vec(
        "subjects_scored",
        "Subjects that received a new score record in the last cycle",
        &["chain", "kind"]
    );

    pub static ref SUBJECTS_SKIPPED: IntGaugeVec = create_int_gauge_vec(
        "subjects_skipped",
        "Subjects that could not be scored in the last cycle",
        &["chain", "kind"]
    );

    pub static ref DEGRADED_CRITERIA: IntCounterVec = create_int_counter_vec(
        "degraded_criteria_total",
        "Criteria recorded as failed because a lookup errored or timed out",
        &["criterion"]
    );

    pub static ref NODE_INFO: IntGaugeVec = create_int_gauge_vec(
        "node_info",
        "Build information of the running scorer",
        &["version"]
    );
}

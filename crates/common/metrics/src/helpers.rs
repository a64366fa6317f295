use prometheus_exporter::prometheus::{
    HistogramOpts, HistogramTimer, HistogramVec, IntCounterVec, IntGaugeVec, Opts,
    default_registry,
};

/// Prefix of every collector this crate registers.
pub const NAMESPACE: &str = "bpmon";

/// Scoring a chain takes from milliseconds (small snapshots) to minutes (slow collaborators).
pub const CYCLE_TIME_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0];

pub fn create_int_gauge_vec(name: &str, help: &str, label_names: &[&str]) -> IntGaugeVec {
    let gauge_vec = IntGaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), label_names)
        .expect("failed to create int gauge vec");
    default_registry()
        .register(Box::new(gauge_vec.clone()))
        .expect("failed to register int gauge vec");
    gauge_vec
}

pub fn set_int_gauge_vec(gauge_vec: &IntGaugeVec, value: i64, label_values: &[&str]) {
    gauge_vec.with_label_values(label_values).set(value);
}

pub fn create_int_counter_vec(name: &str, help: &str, label_names: &[&str]) -> IntCounterVec {
    let counter_vec = IntCounterVec::new(Opts::new(name, help).namespace(NAMESPACE), label_names)
        .expect("failed to create int counter vec");
    default_registry()
        .register(Box::new(counter_vec.clone()))
        .expect("failed to register int counter vec");
    counter_vec
}

pub fn inc_int_counter_vec(counter_vec: &IntCounterVec, label_values: &[&str]) {
    counter_vec.with_label_values(label_values).inc();
}

pub fn create_histogram_vec(
    name: &str,
    help: &str,
    buckets: &[f64],
    label_names: &[&str],
) -> HistogramVec {
    let opts = HistogramOpts::new(name, help)
        .namespace(NAMESPACE)
        .buckets(buckets.to_vec());
    let histogram_vec = HistogramVec::new(opts, label_names).expect("failed to create histogram");
    default_registry()
        .register(Box::new(histogram_vec.clone()))
        .expect("failed to register histogram");
    histogram_vec
}

pub fn start_timer_vec(histogram_vec: &HistogramVec, label_values: &[&str]) -> HistogramTimer {
    histogram_vec.with_label_values(label_values).start_timer()
}

pub fn stop_timer(timer: HistogramTimer) {
    timer.observe_duration()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_and_counter_helpers() {
        let gauge = create_int_gauge_vec("test_gauge", "test gauge", &["chain"]);
        set_int_gauge_vec(&gauge, 7, &["mainnet"]);
        let counter = create_int_counter_vec("test_counter", "test counter", &["criterion"]);
        inc_int_counter_vec(&counter, &["has_ssl"]);
        inc_int_counter_vec(&counter, &["has_ssl"]);

        assert_eq!(gauge.with_label_values(&["mainnet"]).get(), 7);
        assert_eq!(counter.with_label_values(&["has_ssl"]).get(), 2);
    }

    #[test]
    fn test_timer_observes_into_histogram() {
        let histogram = create_histogram_vec(
            "test_histogram",
            "test histogram",
            CYCLE_TIME_BUCKETS,
            &["chain"],
        );
        stop_timer(start_timer_vec(&histogram, &["testnet"]));

        assert_eq!(
            histogram.with_label_values(&["testnet"]).get_sample_count(),
            1
        );
    }
}

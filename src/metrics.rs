use crate::api::Error;
use crate::envelope::Envelope;
use prometheus::{Encoder, GaugeVec, IntCounterVec, TextEncoder};

lazy_static! {
    static ref STATION_CURRENT_POWER_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "station_current_power",
            "current power output reported for station (in kW)",
        ),
        &["source", "station_id"],
    )
    .unwrap();
    static ref STATION_DAY_POWER_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "station_day_power",
            "total amount of power generated by station in current day (in kWh)",
        ),
        &["source", "station_id"],
    )
    .unwrap();
    static ref DEVICE_CURRENT_POWER_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "device_current_power",
            "current power output reported by inverter (in kW)",
        ),
        &["source", "station_id", "device_id"],
    )
    .unwrap();
    static ref CYCLES_COUNTER: IntCounterVec = register_int_counter_vec!(
        opts!("polling_cycles_total", "polling cycles run to completion"),
        &["source"],
    )
    .unwrap();
    static ref TASK_FAILURES_COUNTER: IntCounterVec = register_int_counter_vec!(
        opts!(
            "polling_task_failures_total",
            "requests whose result was dropped because of an error",
        ),
        &["source"],
    )
    .unwrap();
    static ref PUBLISHED_STATIONS_COUNTER: IntCounterVec = register_int_counter_vec!(
        opts!("published_stations_total", "stations handed to the publisher"),
        &["source"],
    )
    .unwrap();
}

/// Feed telemetry of every station (and its inverters) in `envelope` to the gauges.
pub fn observe_envelope(source: &str, envelope: &Envelope) {
    for station in &envelope.stations {
        let params = &station.power_generation_parameters;
        STATION_CURRENT_POWER_GAUGE
            .with_label_values(&[source, &station.id])
            .set(params.current_power_output);

        if let Some(day_power) = params.power_generated_today {
            STATION_DAY_POWER_GAUGE
                .with_label_values(&[source, &station.id])
                .set(day_power);
        }

        for inverter in &station.inverter_list {
            DEVICE_CURRENT_POWER_GAUGE
                .with_label_values(&[source, &station.id, &inverter.id])
                .set(inverter.power_generation_parameters.current_power_output);
        }
    }

    PUBLISHED_STATIONS_COUNTER
        .with_label_values(&[source])
        .inc_by(envelope.stations.len() as u64);
}

pub fn cycle_completed(source: &str) {
    CYCLES_COUNTER.with_label_values(&[source]).inc();
}

pub fn task_failed(source: &str) {
    TASK_FAILURES_COUNTER.with_label_values(&[source]).inc();
}

/// Read metrics from Prometheus exporter registry.
pub fn read() -> Result<String, Error> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .or(Err(Error::FormatError))?;
    String::from_utf8(buffer).or(Err(Error::FormatError))
}

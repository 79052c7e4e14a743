//! Paginated-listing topology: every inverter of every plant comes out of one listing that is
//! walked page by page and accumulated per plant, then published as a single envelope.

use super::{Topology, WorkQueue};
use crate::accumulator::CycleAccumulator;
use crate::api::response::inverter_list;
use crate::api::Error;
use crate::model::PlantSnapshot;
use crate::source::ListingSource;
use async_trait::async_trait;

pub const DEFAULT_MAX_PAGES: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingPage {
    pub page: u32,
}

/// Accumulator of the running cycle. Taken out once the listing is complete, so nothing can be
/// merged into it after its plants were handed over for publishing.
pub type ListingState = Option<CycleAccumulator>;

pub struct PaginatedListing<S> {
    name: &'static str,
    source: S,
    max_pages: u32,
}

impl<S: ListingSource> PaginatedListing<S> {
    pub fn new(name: &'static str, source: S, max_pages: u32) -> Self {
        PaginatedListing {
            name,
            source,
            max_pages: max_pages.max(1),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: ListingSource> Topology for PaginatedListing<S> {
    type Task = ListingPage;
    type State = ListingState;

    fn name(&self) -> &'static str {
        self.name
    }

    fn fresh_state(&self) -> ListingState {
        Some(CycleAccumulator::new())
    }

    fn seed(&self) -> Vec<ListingPage> {
        vec![ListingPage { page: 1 }]
    }

    async fn handle(
        &self,
        task: ListingPage,
        state: &mut ListingState,
        queue: &mut WorkQueue<ListingPage>,
    ) -> Result<Option<Vec<PlantSnapshot>>, Error> {
        let body = self.source.listing_page(task.page).await?;
        let rows = inverter_list::rows(body)?;

        let accumulator = state.as_mut().ok_or_else(|| {
            Error::UnexpectedApiResponse(format!(
                "listing page {} arrived after the cycle was published",
                task.page
            ))
        })?;

        let outcome = accumulator.merge(rows);
        log::debug!("listing page {}: {:?}", task.page, outcome);

        if !accumulator.is_complete(&outcome) {
            if task.page < self.max_pages {
                queue.push(ListingPage {
                    page: task.page + 1,
                });
                return Ok(None);
            }
            log::warn!(
                "listing still growing after {} pages, publishing what was collected",
                task.page
            );
        }

        match state.take() {
            Some(accumulator) if !accumulator.is_empty() => Ok(Some(accumulator.into_snapshots())),
            _ => {
                log::info!("no data received, nothing to publish");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::publisher::test::RecordingPublisher;
    use crate::publisher::{FailurePolicy, Publisher};
    use crate::rescheduler::Rescheduler;
    use crate::testing::read_json;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Serves canned pages; pages it does not know are empty.
    struct CannedListing {
        pages: Mutex<HashMap<u32, Value>>,
        requested: Mutex<Vec<u32>>,
        failing: Option<u32>,
    }

    impl CannedListing {
        fn new(pages: Vec<(u32, Value)>) -> Self {
            CannedListing {
                pages: Mutex::new(pages.into_iter().collect()),
                requested: Mutex::new(Vec::new()),
                failing: None,
            }
        }

        fn set_page(&self, page: u32, body: Value) {
            self.pages.lock().unwrap().insert(page, body);
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ListingSource for CannedListing {
        async fn listing_page(&self, page: u32) -> Result<Value, Error> {
            self.requested.lock().unwrap().push(page);
            if self.failing == Some(page) {
                return Err(Error::RateExceeded("slow down".to_string()));
            }
            Ok(self
                .pages
                .lock()
                .unwrap()
                .get(&page)
                .cloned()
                .unwrap_or_else(|| read_json("growatt_inverter_list_empty.json")))
        }
    }

    fn page(rows: Vec<Value>) -> Value {
        json!({"obj": {"pagers": [{"datas": rows}]}})
    }

    fn row(plant: &str, device: &str, pac: &str, etoday: &str) -> Value {
        json!({
            "plantId": plant,
            "plantName": format!("Plant {}", plant),
            "deviceSn": format!("SN-{}", device),
            "uId": device,
            "pac": pac,
            "etoday": etoday,
            "time": "2021-06-14 10:20:30",
            "status": "1"
        })
    }

    fn pipeline(
        source: CannedListing,
        max_pages: u32,
    ) -> Pipeline<PaginatedListing<CannedListing>, RecordingPublisher> {
        Pipeline::new(
            PaginatedListing::new("growatt", source, max_pages),
            Arc::new(Publisher::new(
                RecordingPublisher::default(),
                vec!["/in/delhi".to_string()],
                FailurePolicy::Terminate,
            )),
            Rescheduler::new(Duration::from_millis(1)),
        )
    }

    fn published(
        pipeline: &Pipeline<PaginatedListing<CannedListing>, RecordingPublisher>,
    ) -> Vec<crate::envelope::Envelope> {
        pipeline.publisher.transport().envelopes()
    }

    #[tokio::test]
    async fn two_pages_two_stations() {
        let source = CannedListing::new(vec![
            (1, page(vec![row("A", "a1", "1.0", "5.0")])),
            (
                2,
                page(vec![row("A", "a2", "2.0", "6.0"), row("B", "b1", "3.0", "7.0")]),
            ),
        ]);
        let pipeline = pipeline(source, DEFAULT_MAX_PAGES);

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(3, report.tasks);
        assert_eq!(vec![1, 2, 3], pipeline.topology().source().requested());

        let envelopes = published(&pipeline);
        assert_eq!(1, envelopes.len());
        let stations = &envelopes[0].stations;
        assert_eq!(2, stations.len());
        assert_eq!("A", stations[0].id);
        assert_eq!(
            vec!["a1", "a2"],
            stations[0]
                .inverter_list
                .iter()
                .map(|i| i.id.as_str())
                .collect::<Vec<_>>()
        );
        assert_eq!("B", stations[1].id);
        assert_eq!(1, stations[1].inverter_list.len());
    }

    #[tokio::test]
    async fn fixture_listing() {
        let source = CannedListing::new(vec![
            (1, read_json("growatt_inverter_list_page1.json")),
            (2, read_json("growatt_inverter_list_page2.json")),
        ]);
        let pipeline = pipeline(source, DEFAULT_MAX_PAGES);
        pipeline.run_cycle().await.unwrap();

        let envelopes = published(&pipeline);
        assert_eq!(vec!["Alpha Farm", "Beta Works"], envelopes[0].station_names());
        assert!(envelopes[0].stations.iter().all(|s| s.id != "1003"));
    }

    #[tokio::test]
    async fn nothing_published_for_idle_first_page() {
        let source = CannedListing::new(vec![
            (1, page(vec![row("A", "a1", "0", "0")])),
            (2, page(vec![row("B", "b1", "1.0", "1.0")])),
        ]);
        let pipeline = pipeline(source, DEFAULT_MAX_PAGES);

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(0, report.envelopes);
        assert_eq!(vec![1], pipeline.topology().source().requested());
        assert!(published(&pipeline).is_empty());
    }

    #[tokio::test]
    async fn page_cap_publishes_collected_plants() {
        let source = CannedListing::new(
            (1..=5)
                .map(|n| (n, page(vec![row(&n.to_string(), "d", "1", "1")])))
                .collect(),
        );
        let pipeline = pipeline(source, 3);

        pipeline.run_cycle().await.unwrap();
        assert_eq!(vec![1, 2, 3], pipeline.topology().source().requested());
        assert_eq!(3, published(&pipeline)[0].stations.len());
    }

    #[tokio::test]
    async fn repeated_page_does_not_duplicate_devices() {
        let same = page(vec![row("A", "a1", "1.0", "1.0")]);
        let source = CannedListing::new(vec![(1, same.clone()), (2, same)]);
        let pipeline = pipeline(source, DEFAULT_MAX_PAGES);

        pipeline.run_cycle().await.unwrap();
        assert_eq!(vec![1, 2], pipeline.topology().source().requested());
        assert_eq!(1, published(&pipeline)[0].stations[0].inverter_list.len());
    }

    #[tokio::test]
    async fn failed_page_abandons_cycle() {
        let mut source = CannedListing::new(vec![(1, page(vec![row("A", "a1", "1.0", "1.0")]))]);
        source.failing = Some(2);
        let pipeline = pipeline(source, DEFAULT_MAX_PAGES);

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(1, report.failed);
        assert!(published(&pipeline).is_empty());
    }

    #[tokio::test]
    async fn identical_cycles_identical_envelopes() {
        let source = CannedListing::new(vec![
            (1, read_json("growatt_inverter_list_page1.json")),
            (2, read_json("growatt_inverter_list_page2.json")),
        ]);
        let pipeline = pipeline(source, DEFAULT_MAX_PAGES);

        pipeline.run_cycle().await.unwrap();
        pipeline.run_cycle().await.unwrap();

        let envelopes = published(&pipeline);
        assert_eq!(2, envelopes.len());
        assert_eq!(
            serde_json::to_string(&envelopes[0]).unwrap(),
            serde_json::to_string(&envelopes[1]).unwrap()
        );
    }

    #[tokio::test]
    async fn next_cycle_starts_from_scratch() {
        let source = CannedListing::new(vec![
            (1, page(vec![row("A", "a1", "1.0", "1.0")])),
            (2, page(vec![row("B", "b1", "1.0", "1.0")])),
        ]);
        let pipeline = pipeline(source, DEFAULT_MAX_PAGES);
        pipeline.run_cycle().await.unwrap();

        let source = pipeline.topology().source();
        source.set_page(1, page(vec![row("C", "c1", "1.0", "1.0")]));
        source.set_page(2, page(vec![]));
        pipeline.run_cycle().await.unwrap();

        let envelopes = published(&pipeline);
        assert_eq!(vec!["Plant A", "Plant B"], envelopes[0].station_names());
        assert_eq!(vec!["Plant C"], envelopes[1].station_names());
    }
}

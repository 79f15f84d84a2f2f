use std::sync::Arc;
use tracing::*;

use crate::{
    collection::Collection,
    errors::DomainError,
    model::{Event, EventData, RecordId},
    notifications::{DevNullNotifier, Notifier},
    sequences::{RandomKeys, Sequence},
    storage::RecordStore,
};

pub const EVENTS: &str = "events";

/// Invoices, stored as the `events` collection.
pub struct Events {
    records: Collection<Event>,
    keys: Arc<dyn Sequence<RecordId>>,
    notifier: Arc<dyn Notifier>,
}

fn not_found(id: &RecordId) -> DomainError {
    DomainError::NotFound(format!("Could not find event for id {}", id))
}

impl Events {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            records: Collection::new(EVENTS, store),
            keys: Arc::new(RandomKeys::default()),
            notifier: Arc::new(DevNullNotifier::default()),
        }
    }

    pub fn with_keys(self, keys: Arc<dyn Sequence<RecordId>>) -> Self {
        Self { keys, ..self }
    }

    pub fn with_notifier(self, notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier, ..self }
    }

    pub async fn get_all(&self) -> Result<Vec<Event>, DomainError> {
        self.records.load().await
    }

    pub async fn get(&self, id: &RecordId) -> Result<Event, DomainError> {
        self.records
            .load()
            .await?
            .into_iter()
            .find(|e| e.id == *id)
            .ok_or_else(|| not_found(id))
    }

    pub async fn add(&self, data: EventData) -> Result<Event, DomainError> {
        self.records
            .modify_and_then(
                |records| {
                    let mut id = self.keys.following();
                    while records.iter().any(|e| e.id == id) {
                        warn!(%id, "events:add:collision");
                        id = self.keys.following();
                    }

                    let event = Event::new(id, data);
                    records.push(event.clone());

                    Ok(event)
                },
                |created| {
                    debug!(id = %created.id, "events:added");

                    if let Err(e) = self.notifier.notify(created) {
                        warn!(id = %created.id, "events:notify: {:?}", e);
                    }
                },
            )
            .await
    }

    pub async fn replace(&self, id: &RecordId, data: EventData) -> Result<Event, DomainError> {
        self.records
            .modify(|records| {
                let index = records
                    .iter()
                    .position(|e| e.id == *id)
                    .ok_or_else(|| not_found(id))?;

                records[index] = Event::new(id.clone(), data);

                Ok(records[index].clone())
            })
            .await
    }

    pub async fn remove(&self, id: &RecordId) -> Result<(), DomainError> {
        self.records
            .modify(|records| {
                let index = records
                    .iter()
                    .position(|e| e.id == *id)
                    .ok_or_else(|| not_found(id))?;

                records.remove(index);

                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Mutex};

    use super::*;
    use crate::{sequences::DeterministicKeys, storage::memory::Memory};
    use anyhow::Result;

    fn invoice(title: &str) -> EventData {
        EventData {
            title: title.to_owned(),
            description: "d".to_owned(),
            date: "2024-01-01".to_owned(),
            image: "http://x".to_owned(),
            location: "Online".to_owned(),
        }
    }

    fn test_events() -> Events {
        Events::new(Memory::new()).with_keys(Arc::new(DeterministicKeys::new("E")))
    }

    #[derive(Default)]
    struct Recording {
        titles: Mutex<Vec<String>>,
    }

    impl Notifier for Recording {
        fn notify(&self, created: &Event) -> anyhow::Result<()> {
            self.titles.lock().unwrap().push(created.data.title.clone());
            Ok(())
        }
    }

    struct Failing {}

    impl Notifier for Failing {
        fn notify(&self, _created: &Event) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("no channel"))
        }
    }

    #[tokio::test]
    async fn it_assigns_id_on_add() -> Result<()> {
        let events = test_events();

        let added = events.add(invoice("Invoice A")).await?;

        insta::assert_json_snapshot!(added, @r###"
        {
          "id": "E-0",
          "title": "Invoice A",
          "description": "d",
          "date": "2024-01-01",
          "image": "http://x",
          "location": "Online"
        }
        "###);

        Ok(())
    }

    #[tokio::test]
    async fn it_gets_what_was_added() -> Result<()> {
        let events = Events::new(Memory::new());

        let added = events.add(invoice("Invoice A")).await?;

        assert!(added.id.valid());
        assert_eq!(events.get(&added.id).await?, Event::new(added.id.clone(), invoice("Invoice A")));

        Ok(())
    }

    #[tokio::test]
    async fn it_preserves_insertion_order() -> Result<()> {
        let events = test_events();

        events.add(invoice("first")).await?;
        events.add(invoice("second")).await?;
        events.add(invoice("third")).await?;

        let titles: Vec<_> = events
            .get_all()
            .await?
            .into_iter()
            .map(|e| e.data.title)
            .collect();

        assert_eq!(titles, vec!["first", "second", "third"]);

        Ok(())
    }

    #[tokio::test]
    async fn it_fails_to_get_missing_id() -> Result<()> {
        let events = test_events();

        let err = events.get(&RecordId::new("nonexistent-id")).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Could not find event for id nonexistent-id");

        Ok(())
    }

    #[tokio::test]
    async fn it_replaces_all_fields_but_id() -> Result<()> {
        let events = test_events();
        let added = events.add(invoice("Invoice A")).await?;

        let replacement = EventData {
            title: "Invoice A (revised)".to_owned(),
            description: "revised".to_owned(),
            date: "2024-02-01".to_owned(),
            image: "http://y".to_owned(),
            location: "Lagos".to_owned(),
        };
        let replaced = events.replace(&added.id, replacement.clone()).await?;

        assert_eq!(replaced.id, added.id);
        assert_eq!(replaced.data, replacement);
        assert_eq!(events.get(&added.id).await?, replaced);

        Ok(())
    }

    #[tokio::test]
    async fn it_fails_to_replace_missing_id() -> Result<()> {
        let events = test_events();
        events.add(invoice("Invoice A")).await?;

        let err = events
            .replace(&RecordId::new("missing"), invoice("Invoice B"))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(events.get_all().await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn it_removes_and_then_fails_to_get() -> Result<()> {
        let events = test_events();
        let keep = events.add(invoice("keep")).await?;
        let drop = events.add(invoice("drop")).await?;

        events.remove(&drop.id).await?;

        assert!(events.get(&drop.id).await.unwrap_err().is_not_found());
        assert!(events.remove(&drop.id).await.unwrap_err().is_not_found());
        assert_eq!(events.get_all().await?, vec![keep]);

        Ok(())
    }

    #[tokio::test]
    async fn it_notifies_once_per_add_in_commit_order() -> Result<()> {
        let recording = Arc::new(Recording::default());
        let events = test_events().with_notifier(recording.clone());

        let added = events.add(invoice("Invoice A")).await?;
        events.replace(&added.id, invoice("Invoice A2")).await?;
        events.add(invoice("Invoice B")).await?;
        events.remove(&added.id).await?;

        assert_eq!(
            *recording.titles.lock().unwrap(),
            vec!["Invoice A".to_owned(), "Invoice B".to_owned()]
        );

        Ok(())
    }

    #[tokio::test]
    async fn it_adds_even_when_notifier_fails() -> Result<()> {
        let events = test_events().with_notifier(Arc::new(Failing {}));

        let added = events.add(invoice("Invoice A")).await?;

        assert_eq!(events.get(&added.id).await?, added);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn it_loses_no_concurrent_adds() -> Result<()> {
        let events = Arc::new(Events::new(Memory::new()));

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let events = events.clone();
                tokio::spawn(async move { events.add(invoice(&format!("Invoice {}", i))).await })
            })
            .collect();

        for handle in futures::future::join_all(handles).await {
            handle??;
        }

        let ids: HashSet<_> = events.get_all().await?.into_iter().map(|e| e.id).collect();

        assert_eq!(ids.len(), 50);

        Ok(())
    }

    #[tokio::test]
    async fn it_skips_keys_already_in_use() -> Result<()> {
        let store = Memory::new();
        let first = Events::new(store.clone()).with_keys(Arc::new(DeterministicKeys::new("E")));
        first.add(invoice("one")).await?;

        let second = Events::new(store).with_keys(Arc::new(DeterministicKeys::new("E")));
        let added = second.add(invoice("two")).await?;

        assert_eq!(added.id, RecordId::new("E-1"));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn it_loses_no_adds_from_repositories_sharing_a_store() -> Result<()> {
        let store = Memory::new();
        let first = Arc::new(Events::new(store.clone()));
        let second = Arc::new(Events::new(store));

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let events = if i % 2 == 0 { first.clone() } else { second.clone() };
                tokio::spawn(async move { events.add(invoice(&format!("Invoice {}", i))).await })
            })
            .collect();

        for handle in futures::future::join_all(handles).await {
            handle??;
        }

        assert_eq!(first.get_all().await?.len(), 40);
        assert_eq!(second.get_all().await?.len(), 40);

        Ok(())
    }
}

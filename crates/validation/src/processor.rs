//! Per-tick item processors.
//!
//! The owning simulation loop drives processors once per tick: every live,
//! non-destroyed item is offered to every processor whose filter accepts it.
//! A failing processor is logged and recorded; it stops neither the other
//! processors on that item nor the remaining items.

use stockpile_core::ItemId;
use stockpile_items::ItemStore;

use crate::filter::Filter;
use crate::registry::ValidationStore;

pub trait Processor {
    fn name(&self) -> &str;

    /// Items this processor applies to.
    fn filter(&self) -> &Filter;

    fn apply(&mut self, store: &mut ItemStore, id: ItemId) -> anyhow::Result<()>;
}

/// One processor failure on one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFailure {
    pub processor: String,
    pub item_id: ItemId,
    pub message: String,
}

/// Outcome of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub visited: usize,
    pub applied: usize,
    pub failures: Vec<ProcessFailure>,
}

impl ProcessReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Default)]
pub struct ProcessorRunner {
    processors: Vec<Box<dyn Processor>>,
}

impl ProcessorRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, processor: impl Processor + 'static) {
        self.processors.push(Box::new(processor));
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Run every processor over every item, in id order.
    ///
    /// Filters are evaluated against the item as it is at that moment, so a
    /// processor sees the effects of the ones registered before it.
    pub fn run(&mut self, store: &mut ItemStore, operators: &ValidationStore) -> ProcessReport {
        let mut report = ProcessReport::default();
        let ids: Vec<ItemId> = store.ids().collect();

        for id in ids {
            match store.get(id) {
                Some(item) if !item.is_destroyed() => report.visited += 1,
                _ => continue,
            }

            for processor in self.processors.iter_mut() {
                // An earlier processor may have removed or destroyed the item.
                let accepted = match store.get(id) {
                    Some(item) if !item.is_destroyed() => processor.filter().validate(operators, item),
                    _ => false,
                };
                if !accepted {
                    continue;
                }

                match processor.apply(store, id) {
                    Ok(()) => report.applied += 1,
                    Err(err) => {
                        tracing::error!(
                            processor = processor.name(),
                            item_id = %id,
                            error = %err,
                            "processor failed"
                        );
                        report.failures.push(ProcessFailure {
                            processor: processor.name().to_string(),
                            item_id: id,
                            message: format!("{err:#}"),
                        });
                    }
                }
            }
        }

        report
    }
}

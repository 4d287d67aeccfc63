use std::fmt;

use mimefilter_buffer::Output;
use tracing::debug;

use crate::filter::{Lifecycle, MimeFilter};

/// Handle for a filter attached to a [`FilterChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(u32);

impl FilterId {
    /// Raw numeric id.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Stage {
    id: FilterId,
    filter: Box<dyn MimeFilter + Send>,
}

/// An ordered pipeline of filters that is itself a filter.
///
/// The output of each stage, together with the prespace it reserved, is the
/// input of the next. An empty chain passes its input through.
pub struct FilterChain {
    stages: Vec<Stage>,
    next_id: u32,
    lifecycle: Lifecycle,
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("stages", &self.ids().collect::<Vec<_>>())
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

impl FilterChain {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            next_id: 1,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Append `filter` to the end of the chain.
    pub fn add<F: MimeFilter + Send + 'static>(&mut self, filter: F) -> FilterId {
        self.add_boxed(Box::new(filter))
    }

    /// Append an already boxed filter to the end of the chain.
    pub fn add_boxed(&mut self, filter: Box<dyn MimeFilter + Send>) -> FilterId {
        let id = FilterId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.stages.push(Stage { id, filter });
        debug!(%id, stages = self.stages.len(), "filter added to chain");
        id
    }

    /// Detach the filter registered under `id`.
    pub fn remove(&mut self, id: FilterId) -> Option<Box<dyn MimeFilter + Send>> {
        let pos = self.stages.iter().position(|stage| stage.id == id)?;
        let stage = self.stages.remove(pos);
        debug!(%id, stages = self.stages.len(), "filter removed from chain");
        Some(stage.filter)
    }

    /// Number of attached filters.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True when no filter is attached.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Ids of the attached filters, in pipeline order.
    pub fn ids(&self) -> impl Iterator<Item = FilterId> + '_ {
        self.stages.iter().map(|stage| stage.id)
    }
}

fn run<'a>(stages: &'a mut [Stage], input: &'a [u8], prespace: usize, last: bool) -> Output<'a> {
    let mut out = Output::shared(input);
    let mut prespace = prespace;
    for stage in stages.iter_mut() {
        let data = out.into_bytes();
        out = if last {
            stage.filter.complete(data, prespace)
        } else {
            stage.filter.filter(data, prespace)
        };
        prespace = out.prespace();
    }
    out
}

impl MimeFilter for FilterChain {
    fn filter<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Output<'a> {
        self.lifecycle.on_filter("chain");
        run(&mut self.stages, input, prespace, false)
    }

    fn complete<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Output<'a> {
        self.lifecycle.on_complete("chain");
        run(&mut self.stages, input, prespace, true)
    }

    fn reset(&mut self) {
        self.lifecycle.on_reset();
        for stage in &mut self.stages {
            stage.filter.reset();
        }
    }
}

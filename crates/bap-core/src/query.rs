//! Deferred collection queries.
//!
//! A [`Query`] records a source and an ordered list of labelled stages.
//! Building one never touches pixel data; only [`Query::evaluate`] (called
//! by a [`Backend`](crate::backend::Backend)) runs the stages.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::catalog::SensorId;
use crate::error::Result;
use crate::image::Image;

pub type ImageFn = Arc<dyn Fn(Image) -> Result<Image> + Send + Sync>;
pub type FilterFn = Arc<dyn Fn(&Image) -> bool + Send + Sync>;
pub type CollectionFn = Arc<dyn Fn(Vec<Image>) -> Result<Vec<Image>> + Send + Sync>;

#[derive(Clone)]
pub enum Source {
    /// A raw sensor collection fetched from the backend.
    Sensor(SensorId),
    Images(Vec<Image>),
    /// Concatenation of sub-queries, in order.
    Union(Vec<Query>),
}

#[derive(Clone)]
pub enum Stage {
    Map { label: String, f: ImageFn },
    Filter { label: String, f: FilterFn },
    Collection { label: String, f: CollectionFn },
    /// Cooperative wait before the following stages run.
    Pace { label: String, duration: Duration },
}

impl Stage {
    pub fn label(&self) -> &str {
        match self {
            Stage::Map { label, .. }
            | Stage::Filter { label, .. }
            | Stage::Collection { label, .. }
            | Stage::Pace { label, .. } => label,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Stage::Map { .. } => "map",
            Stage::Filter { .. } => "filter",
            Stage::Collection { .. } => "collection",
            Stage::Pace { .. } => "pace",
        }
    }
}

#[derive(Clone)]
pub struct Query {
    source: Source,
    stages: Vec<Stage>,
}

impl Query {
    pub fn sensor(id: SensorId) -> Self {
        Self {
            source: Source::Sensor(id),
            stages: Vec::new(),
        }
    }

    pub fn images(images: Vec<Image>) -> Self {
        Self {
            source: Source::Images(images),
            stages: Vec::new(),
        }
    }

    pub fn union(queries: Vec<Query>) -> Self {
        Self {
            source: Source::Union(queries),
            stages: Vec::new(),
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn map<F>(mut self, label: impl Into<String>, f: F) -> Self
    where
        F: Fn(Image) -> Result<Image> + Send + Sync + 'static,
    {
        self.stages.push(Stage::Map {
            label: label.into(),
            f: Arc::new(f),
        });
        self
    }

    pub fn filter<F>(mut self, label: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Image) -> bool + Send + Sync + 'static,
    {
        self.stages.push(Stage::Filter {
            label: label.into(),
            f: Arc::new(f),
        });
        self
    }

    pub fn collection<F>(mut self, label: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Image>) -> Result<Vec<Image>> + Send + Sync + 'static,
    {
        self.stages.push(Stage::Collection {
            label: label.into(),
            f: Arc::new(f),
        });
        self
    }

    pub fn pace(mut self, label: impl Into<String>, duration: Duration) -> Self {
        if !duration.is_zero() {
            self.stages.push(Stage::Pace {
                label: label.into(),
                duration,
            });
        }
        self
    }

    /// Stage labels, one line per stage, nested unions indented.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.describe_into(0, &mut lines);
        lines
    }

    fn describe_into(&self, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        match &self.source {
            Source::Sensor(id) => lines.push(format!("{indent}source {id}")),
            Source::Images(images) => lines.push(format!("{indent}source {} image(s)", images.len())),
            Source::Union(queries) => {
                lines.push(format!("{indent}union of {}", queries.len()));
                for q in queries {
                    q.describe_into(depth + 1, lines);
                }
            }
        }
        for stage in &self.stages {
            lines.push(format!("{indent}{} {}", stage.kind(), stage.label()));
        }
    }

    /// Materialise the query, fetching raw collections through `fetch`.
    pub fn evaluate(&self, fetch: &dyn Fn(SensorId) -> Result<Vec<Image>>) -> Result<Vec<Image>> {
        self.run(fetch, true)
    }

    /// [`evaluate`](Self::evaluate) with every pace stage skipped.
    pub fn evaluate_unpaced(&self, fetch: &dyn Fn(SensorId) -> Result<Vec<Image>>) -> Result<Vec<Image>> {
        self.run(fetch, false)
    }

    fn run(&self, fetch: &dyn Fn(SensorId) -> Result<Vec<Image>>, paced: bool) -> Result<Vec<Image>> {
        let mut images = match &self.source {
            Source::Sensor(id) => fetch(*id)?,
            Source::Images(images) => images.clone(),
            Source::Union(queries) => {
                let mut all = Vec::new();
                for q in queries {
                    all.extend(q.run(fetch, paced)?);
                }
                all
            }
        };

        for stage in &self.stages {
            images = match stage {
                Stage::Map { f, .. } => images.into_iter().map(|img| f(img)).collect::<Result<_>>()?,
                Stage::Filter { f, .. } => images.into_iter().filter(|img| f(img)).collect(),
                Stage::Collection { f, .. } => f(images)?,
                Stage::Pace { label, duration } => {
                    if paced {
                        debug!(stage = %label, ms = duration.as_millis() as u64, "pacing");
                        std::thread::sleep(*duration);
                    }
                    images
                }
            };
        }
        Ok(images)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.describe()).finish()
    }
}

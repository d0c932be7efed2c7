use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::Backend;
use crate::catalog::{descriptor_for, SensorId};
use crate::consts::{BAP_VERSION, COL_ID_BAND, DATE_BAND, FIRST_PRIORITY_YEAR, YEAR_PROPERTY};
use crate::error::{BapError, Result};
use crate::filters::FilterConfig;
use crate::image::{Grid, Image, Rect};
use crate::priority::{is_slc_off, last_supported_year, satellites_for};
use crate::query::Query;
use crate::retry::Executor;
use crate::scores::{ScoreConfig, ScoreContext};

use super::config::{BapConfig, Selection};
use super::helpers::{
    add_provenance_bands, harmonize_pool, mask_by_first_band, native_proxy, rename_to_canonical,
    rescale_to_target, scored_proxy, tag, zero_proxy_scores,
};
use super::provenance::{Composite, Provenance};
use super::reduce::{quality_mosaic, reduce_pool};
use super::types::{CompositeStage, NoOpReporter, ProgressReporter};

/// Deferred candidate query of one sensor for one season year.
#[derive(Clone, Debug)]
pub struct CollectionPlan {
    pub sensor: SensorId,
    pub year: i32,
    pub query: Query,
}

/// A validated composite request.
#[derive(Clone, Debug)]
pub struct Bap {
    config: BapConfig,
    /// Scores with unique output names.
    scores: Vec<ScoreConfig>,
}

impl Bap {
    /// Validate `config` and give every score a unique band name
    /// (`score-doy`, `score-doy_1`, ...).
    pub fn new(config: BapConfig) -> Result<Self> {
        let last = last_supported_year();
        for year in config.years() {
            if !(FIRST_PRIORITY_YEAR..=last).contains(&year) {
                return Err(BapError::UnsupportedYear {
                    year,
                    first: FIRST_PRIORITY_YEAR,
                    last,
                });
            }
        }
        if config.sensors.as_ref().is_some_and(Vec::is_empty) {
            return Err(BapError::InvalidConfig("explicit sensor list is empty".into()));
        }
        if let Selection::Reduce { top_k: 0, .. } = config.selection {
            return Err(BapError::InvalidConfig("top_k must be at least 1".into()));
        }

        let mut scores = config.scores.clone();
        let mut seen: HashSet<String> = HashSet::new();
        for score in &mut scores {
            score.validate()?;
            let base = score.name().to_string();
            let mut name = base.clone();
            let mut n = 1;
            while seen.contains(&name) {
                name = format!("{base}_{n}");
                n += 1;
            }
            if name != base {
                debug!(from = %base, to = %name, "renamed duplicate score");
                score.set_name(name.clone());
            }
            seen.insert(name);
        }

        let reserved = [config.score_band.as_str(), COL_ID_BAND, DATE_BAND];
        if config.score_band.is_empty() || reserved[1..].contains(&reserved[0]) {
            return Err(BapError::InvalidConfig(format!(
                "invalid score band name '{}'",
                config.score_band
            )));
        }
        if let Some(clash) = reserved.iter().find(|r| seen.contains(**r)) {
            return Err(BapError::InvalidConfig(format!(
                "score name '{clash}' collides with a reserved band"
            )));
        }

        for filter in &config.filters {
            if let FilterConfig::MaskCover { prop, .. } = filter {
                let written = scores
                    .iter()
                    .any(|s| matches!(s, ScoreConfig::MaskPercent(_)) && s.name() == prop);
                if !written {
                    return Err(BapError::InvalidConfig(format!(
                        "MaskCover filter needs a MaskPercent score named '{prop}'"
                    )));
                }
            }
        }

        Ok(Self { config, scores })
    }

    pub fn config(&self) -> &BapConfig {
        &self.config
    }

    pub fn scores(&self) -> &[ScoreConfig] {
        &self.scores
    }

    pub fn score_names(&self) -> Vec<String> {
        self.scores.iter().map(|s| s.name().to_string()).collect()
    }

    /// Collections gathered for `year`: the explicit list (restricted to
    /// sensors acquiring that year) or the year's priority list.
    pub fn sensors_for(&self, year: i32) -> Result<Vec<SensorId>> {
        match &self.config.sensors {
            Some(sensors) => Ok(sensors
                .iter()
                .copied()
                .filter(|s| descriptor_for(*s).valid_in(year))
                .collect()),
            None => Ok(satellites_for(year)?.to_vec()),
        }
    }

    /// Build the deferred query of one sensor and season year.
    pub fn collection_query(&self, sensor: SensorId, year: i32, site: Rect, grid: Grid) -> Result<Query> {
        let cfg = &self.config;
        let desc = descriptor_for(sensor);
        let target = descriptor_for(cfg.target);
        let window = cfg.season.add_year(year)?;
        let anchor = window.start;
        let slc_off = is_slc_off(sensor, year);
        let score_names = self.score_names();

        let mut query = Query::sensor(sensor)
            .filter("filter bounds", move |img| img.footprint.intersects(&site))
            .filter(format!("filter date {window}"), move |img| window.contains(img.date));
        for filter in cfg.filters.iter().filter(|f| !f.is_post_score()) {
            query = filter.apply(query, desc);
        }

        query = query
            .collection("proxy if empty", move |images| {
                if images.is_empty() {
                    debug!(sensor = %sensor, year, "empty collection, using proxy");
                    return Ok(vec![native_proxy(desc, year, anchor, grid, site)]);
                }
                Ok(images)
            })
            .map("clip", move |img| Ok(img.clip(&site)))
            .map("tag", move |img| Ok(tag(img, desc, year)));

        if slc_off {
            query = query.map("unmask slc-off", move |img| Ok(img.unmask().clip(&site)));
        }
        if !cfg.masks.is_empty() {
            let masks = cfg.masks.clone();
            query = query.map("masks", move |mut img| {
                for mask in &masks {
                    mask.apply(&mut img, desc);
                }
                Ok(img)
            });
        }
        query = query
            .map("rename", move |img| Ok(rename_to_canonical(img, desc)))
            .map(format!("rescale to {}", target.short_name), move |img| {
                Ok(rescale_to_target(img, desc, target))
            });
        if !cfg.indices.is_empty() {
            let indices = cfg.indices.clone();
            query = query.map("indices", move |mut img| {
                for index in &indices {
                    index.apply(&mut img);
                }
                Ok(img)
            });
        }

        let ctx = ScoreContext {
            sensor: desc,
            target,
            year,
            main_year: cfg.year,
            region: site,
            grid,
            season: cfg.season,
            slc_off,
        };
        for score in &self.scores {
            query = score.map(query, &ctx);
        }

        let names = score_names.clone();
        query = query
            .map("zero proxy scores", move |img| Ok(zero_proxy_scores(img, &names)))
            .map("mask by first band", |img| Ok(mask_by_first_band(img)));
        for filter in cfg.filters.iter().filter(|f| f.is_post_score()) {
            query = filter.apply(query, desc);
        }

        let indices = cfg.indices.clone();
        Ok(query
            .collection("proxy if filtered out", move |images| {
                if images.is_empty() {
                    debug!(sensor = %sensor, year, "all candidates filtered, using proxy");
                    return Ok(vec![scored_proxy(desc, year, anchor, grid, site, &indices, &score_names)]);
                }
                Ok(images)
            })
            .map("provenance bands", move |img| Ok(add_provenance_bands(img, desc))))
    }

    /// One deferred query per sensor and season year, in year order.
    pub fn plan(&self, site: Rect, grid: Grid) -> Result<Vec<CollectionPlan>> {
        let mut plans = Vec::new();
        for year in self.config.years() {
            for sensor in self.sensors_for(year)? {
                plans.push(CollectionPlan {
                    sensor,
                    year,
                    query: self.collection_query(sensor, year, site, grid)?,
                });
            }
        }
        Ok(plans)
    }

    /// The whole candidate pool as one deferred query. Nothing is evaluated.
    pub fn candidate_query(&self, backend: &dyn Backend, site: Rect) -> Result<Query> {
        let plans = self.plan(site, backend.grid())?;
        let names = self.score_names();
        let config = self.config.clone();
        Ok(Query::union(plans.into_iter().map(|p| p.query).collect())
            .collection("harmonize pool", move |images| harmonize_pool(images, &names, &config)))
    }

    /// Materialise the pool and select the composite.
    pub fn composite(
        &self,
        backend: &dyn Backend,
        site: Rect,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<Composite> {
        let cfg = &self.config;
        let grid = backend.grid();

        reporter.begin_stage(CompositeStage::Planning, None);
        let plans = self.plan(site, grid)?;
        reporter.finish_stage();
        if plans.is_empty() {
            return Err(BapError::EmptyCollection);
        }
        info!(
            collections = plans.len(),
            backend = backend.name(),
            year = cfg.year,
            "Planned candidate queries"
        );

        let executor = Executor::new(backend, cfg.retry);
        let mut pool: Vec<Image> = Vec::new();
        let mut image_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut used_images = Vec::new();

        reporter.begin_stage(CompositeStage::Gathering, Some(plans.len()));
        for (i, plan) in plans.iter().enumerate() {
            let label = format!("{} {}", plan.sensor, plan.year);
            let images = executor.evaluate(&label, &plan.query)?;
            let real: Vec<&Image> = images.iter().filter(|img| !img.proxy).collect();
            info!(sensor = %plan.sensor, year = plan.year, images = real.len(), "Gathered collection");
            *image_counts.entry(plan.sensor.to_string()).or_insert(0) += real.len();
            used_images.extend(real.iter().map(|img| format!("{}/{}", plan.sensor, img.id)));
            pool.extend(images);
            reporter.advance(i + 1);
        }
        reporter.finish_stage();

        reporter.begin_stage(CompositeStage::Harmonizing, Some(pool.len()));
        let pool = harmonize_pool(pool, &self.score_names(), cfg)?;
        reporter.finish_stage();

        reporter.begin_stage(CompositeStage::Selecting, None);
        let mut image = match cfg.selection {
            Selection::QualityMosaic => quality_mosaic(&pool, &cfg.score_band)?,
            Selection::Reduce { reducer, top_k } => reduce_pool(&pool, &cfg.score_band, reducer, top_k)?,
        };
        reporter.finish_stage();

        let mut seasons = BTreeMap::new();
        for year in cfg.years() {
            seasons.insert(year, cfg.season.add_year(year)?);
        }
        let time_start = cfg.season.add_year(cfg.year)?.start;
        image.id = format!("bap-{}", cfg.year);
        image.date = time_start;
        image.footprint = site;
        image.set_property(YEAR_PROPERTY, f64::from(cfg.year));

        let provenance = Provenance {
            time_start,
            version: BAP_VERSION.to_string(),
            seasons,
            image_counts,
            used_images,
            parameters: cfg.to_keyed()?,
        };
        info!(
            images = provenance.total_images(),
            bands = image.bands.len(),
            "Composite complete"
        );
        Ok(Composite { image, provenance })
    }

    /// [`composite`](Self::composite) without progress reporting.
    pub fn composite_quiet(&self, backend: &dyn Backend, site: Rect) -> Result<Composite> {
        self.composite(backend, site, Arc::new(NoOpReporter))
    }
}

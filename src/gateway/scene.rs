//! Immersive street-level scenes (look-around).
//!
//! DESIGN
//! ======
//! Two operations, both behind the immersive-scene capability gate:
//!
//! - `probe_availability` answers a bool. Lookup errors and empty results
//!   both collapse to `false`; nothing is surfaced to the caller.
//! - `present` is fire-and-forget. The lookup runs on its own task and the
//!   scene goes to whatever presentation context is in the foreground when
//!   the lookup finishes. With no context the scene is dropped.
//!
//! A newer `present` supersedes an older one: each call takes a generation
//! number and only the latest generation may present. There is no
//! cancellation of the lookup itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::capability::Capabilities;
use crate::frame::ErrorCode;
use crate::geo::LatLng;

// =============================================================================
// TYPES
// =============================================================================

/// A resolved immersive scene for one coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub id: String,
    pub coordinate: LatLng,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SceneError {
    #[error("scene lookup failed: {0}")]
    Lookup(String),
}

impl ErrorCode for SceneError {
    fn error_code(&self) -> &'static str {
        "E_SCENE_LOOKUP"
    }

    fn retryable(&self) -> bool {
        true
    }
}

macro_rules! poi_categories {
    ($($variant:ident => $name:literal,)+) => {
        /// Point-of-interest category used to filter an immersive scene.
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum PoiCategory {
            $($variant,)+
            /// A category name outside the standard set, passed through verbatim.
            Other(String),
        }

        impl PoiCategory {
            #[must_use]
            pub fn from_name(name: &str) -> Self {
                match name {
                    $($name => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }

            #[must_use]
            pub fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $name,)+
                    Self::Other(name) => name,
                }
            }
        }
    };
}

poi_categories! {
    Airport => "airport",
    AmusementPark => "amusementPark",
    Aquarium => "aquarium",
    Atm => "atm",
    Bakery => "bakery",
    Bank => "bank",
    Beach => "beach",
    Brewery => "brewery",
    Cafe => "cafe",
    Campground => "campground",
    CarRental => "carRental",
    EvCharger => "evCharger",
    FireStation => "fireStation",
    FitnessCenter => "fitnessCenter",
    FoodMarket => "foodMarket",
    GasStation => "gasStation",
    Hospital => "hospital",
    Hotel => "hotel",
    Laundry => "laundry",
    Library => "library",
    Marina => "marina",
    MovieTheater => "movieTheater",
    Museum => "museum",
    NationalPark => "nationalPark",
    Nightlife => "nightlife",
    Park => "park",
    Parking => "parking",
    Pharmacy => "pharmacy",
    Police => "police",
    PostOffice => "postOffice",
    PublicTransport => "publicTransport",
    Restaurant => "restaurant",
    Restroom => "restroom",
    School => "school",
    Stadium => "stadium",
    Store => "store",
    Theater => "theater",
    University => "university",
    Winery => "winery",
    Zoo => "zoo",
}

/// Which points of interest the presented scene shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoiFilter {
    Unrestricted,
    Including(Vec<PoiCategory>),
}

impl PoiFilter {
    /// An empty category list means no filter.
    #[must_use]
    pub fn from_categories(categories: Vec<PoiCategory>) -> Self {
        if categories.is_empty() { Self::Unrestricted } else { Self::Including(categories) }
    }
}

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Platform scene lookup.
#[async_trait]
pub trait SceneProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `SceneError` if the lookup itself fails. "No scene here" is
    /// `Ok(None)`.
    async fn lookup(&self, coordinate: LatLng) -> Result<Option<Scene>, SceneError>;
}

/// Resolves where a scene can be shown right now.
pub trait ScenePresenter: Send + Sync {
    /// The foreground presentation context, if one exists at this moment.
    fn foreground_context(&self) -> Option<Arc<dyn PresentationContext>>;
}

pub trait PresentationContext: Send + Sync {
    fn present(&self, scene: Scene, filter: PoiFilter);
}

// =============================================================================
// GATEWAY
// =============================================================================

#[derive(Clone)]
pub struct SceneGateway {
    capabilities: Arc<dyn Capabilities>,
    provider: Arc<dyn SceneProvider>,
    presenter: Arc<dyn ScenePresenter>,
    generation: Arc<AtomicU64>,
}

impl SceneGateway {
    #[must_use]
    pub fn new(
        capabilities: Arc<dyn Capabilities>,
        provider: Arc<dyn SceneProvider>,
        presenter: Arc<dyn ScenePresenter>,
    ) -> Self {
        Self { capabilities, provider, presenter, generation: Arc::new(AtomicU64::new(0)) }
    }

    /// Whether a scene exists at `coordinate`. False below the capability
    /// gate, without a lookup.
    pub async fn probe_availability(&self, coordinate: LatLng) -> bool {
        if !self.capabilities.supports_immersive_scenes() {
            debug!("immersive scenes unsupported; probe answers false");
            return false;
        }
        match self.provider.lookup(coordinate).await {
            Ok(scene) => scene.is_some(),
            Err(e) => {
                debug!(error = %e, "scene probe failed; answering false");
                false
            }
        }
    }

    /// Look up and present a scene in the background. Returns `None` when
    /// the capability gate is closed and nothing was started.
    pub fn present(&self, coordinate: LatLng, categories: Vec<PoiCategory>) -> Option<JoinHandle<()>> {
        if !self.capabilities.supports_immersive_scenes() {
            debug!("immersive scenes unsupported; present ignored");
            return None;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let provider = Arc::clone(&self.provider);
        let presenter = Arc::clone(&self.presenter);
        let filter = PoiFilter::from_categories(categories);

        Some(tokio::spawn(async move {
            let scene = match provider.lookup(coordinate).await {
                Ok(Some(scene)) => scene,
                Ok(None) => {
                    warn!(lat = coordinate.latitude, lng = coordinate.longitude, "no scene at coordinate");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "scene lookup failed");
                    return;
                }
            };
            if latest.load(Ordering::SeqCst) != generation {
                debug!(generation, "scene superseded before presentation");
                return;
            }
            let Some(context) = presenter.foreground_context() else {
                debug!("no foreground presentation context; scene dropped");
                return;
            };
            info!(scene = %scene.id, "presenting scene");
            context.present(scene, filter);
        }))
    }
}

#[cfg(test)]
#[path = "scene_test.rs"]
mod tests;

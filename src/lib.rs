//! Resource scaffold: declarative CRUD controllers over a pluggable data store.

pub mod config;
pub mod controller;
pub mod error;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod presenter;
pub mod repository;
pub mod response;
pub mod routes;
pub mod rules;
pub mod sql;
pub mod state;
pub mod store;
pub mod upload;
pub mod validation;

pub use config::{load_from_path, resolve, ControllerSettings, ResolvedResource, ResourceConfig, ResourceDefinition, ReturnPolicy, ScaffoldDefaults};
pub use controller::{QueryParams, Rejection, ResourceController, ResourceRequest, ResourceResponse};
pub use error::{AppError, ConfigError};
pub use guard::DependencyGuard;
pub use presenter::{JsonPresenter, Presenter};
pub use repository::{Collection, Entity, ListQuery, PageInfo, Repository, RequestPayload, ResourceRepository};
pub use routes::{common_routes, common_routes_with_ready, resource_routes};
pub use state::{AppState, ResourceRegistry};
pub use store::{ensure_database_exists, DataStore, PgDataStore};
pub use upload::{LocalUploadSink, UploadSink, UploadedFile};

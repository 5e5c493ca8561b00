//! Resource controller: the five CRUD operations and their response shapes.

use crate::config::{ControllerSettings, ResolvedResource, ReturnPolicy};
use crate::error::AppError;
use crate::guard::DependencyGuard;
use crate::presenter::Presenter;
use crate::repository::{ListQuery, PageInfo, Repository, RequestPayload};
use crate::rules::{bind_unique, merge, normalize, FieldRules, RuleSet};
use crate::validation::{FieldErrors, RequestValidator};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Free-form query string parameters.
pub type QueryParams = BTreeMap<String, String>;

/// Query parameter selecting the page of a paginated list.
pub const PAGE_PARAM: &str = "page";

/// Inbound request as seen by the controller.
#[derive(Clone, Debug, Default)]
pub struct ResourceRequest {
    pub payload: RequestPayload,
    pub query: QueryParams,
    /// Background (ajax-style) call rather than a full navigation.
    pub background: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Rejection {
    Fields(FieldErrors),
    /// Messages of every dependency that blocks a delete.
    Blocked(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResourceResponse {
    Collection {
        view: String,
        records: Vec<Value>,
        pagination_info: Option<PageInfo>,
    },
    Record {
        view: String,
        record: Value,
    },
    NotFound,
    BadRequest(Rejection),
    Success,
    Redirect,
}

pub struct ResourceController {
    settings: ControllerSettings,
    repository: Arc<dyn Repository>,
    presenter: Arc<dyn Presenter>,
}

impl ResourceController {
    pub fn new(settings: ControllerSettings, repository: Arc<dyn Repository>, presenter: Arc<dyn Presenter>) -> Self {
        ResourceController {
            settings,
            repository,
            presenter,
        }
    }

    pub fn from_resolved(
        resolved: ResolvedResource,
        repository: Arc<dyn Repository>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self::new(resolved.settings, repository, presenter)
    }

    pub fn name(&self) -> &str {
        &self.repository.definition().name
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    pub fn presenter(&self) -> &Arc<dyn Presenter> {
        &self.presenter
    }

    /// Request params merged with the static list options; the static options win.
    fn list_query(&self, params: &QueryParams) -> ListQuery {
        let options = &self.settings.list_options;
        let page = params
            .get(PAGE_PARAM)
            .and_then(|p| p.trim().parse().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1);
        let filters = params
            .iter()
            .filter(|(k, _)| k.as_str() != PAGE_PARAM)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        ListQuery {
            filters,
            select: options.select.clone(),
            per_page: options.paginate,
            page,
            as_model: true,
        }
    }

    pub async fn list(&self, params: &QueryParams) -> Result<ResourceResponse, AppError> {
        let collection = self.repository.list(&self.list_query(params)).await?;
        let pagination_info = collection.pagination_info().cloned();
        Ok(ResourceResponse::Collection {
            view: self.settings.view_path("index"),
            records: collection.records,
            pagination_info,
        })
    }

    pub async fn fetch(&self, id: i64) -> Result<ResourceResponse, AppError> {
        if !self.repository.has(id).await? {
            return Ok(ResourceResponse::NotFound);
        }
        let record = self.repository.fetch_projected(id).await?;
        Ok(ResourceResponse::Record {
            view: self.settings.view_path("index"),
            record,
        })
    }

    /// Compose `all` with the operation's scoped rules and bind bare uniqueness rules to this
    /// resource's table, excluding `exclude_id` when updating.
    fn compose_rules(&self, scoped: &RuleSet, exclude_id: Option<i64>) -> FieldRules {
        let mut rules = normalize(merge(&self.settings.rules.all, scoped));
        let definition = self.repository.definition();
        bind_unique(&mut rules, self.repository.table_identifier(), &definition.primary_key, exclude_id);
        rules
    }

    async fn validate(&self, rules: &FieldRules, payload: &RequestPayload) -> Result<Option<ResourceResponse>, AppError> {
        let errors = RequestValidator::new(self.repository.as_ref())
            .validate(rules, payload)
            .await?;
        if errors.is_empty() {
            return Ok(None);
        }
        tracing::warn!(resource = %self.name(), fields = ?errors.keys().collect::<Vec<_>>(), "payload rejected");
        Ok(Some(ResourceResponse::BadRequest(Rejection::Fields(errors))))
    }

    pub async fn create(&self, request: &ResourceRequest) -> Result<ResourceResponse, AppError> {
        let rules = self.compose_rules(&self.settings.rules.store, None);
        if let Some(rejected) = self.validate(&rules, &request.payload).await? {
            return Ok(rejected);
        }
        let entity = self.repository.create(&request.payload).await?;
        match self.settings.return_on_store {
            ReturnPolicy::SingleRecord => self.fetch(entity.id).await,
            ReturnPolicy::AllRecords => self.list(&request.query).await,
            ReturnPolicy::Redirect => Ok(ResourceResponse::Redirect),
        }
    }

    pub async fn update(&self, id: i64, request: &ResourceRequest) -> Result<ResourceResponse, AppError> {
        if !self.repository.has(id).await? {
            return Ok(ResourceResponse::NotFound);
        }
        let rules = self.compose_rules(&self.settings.rules.update, Some(id));
        if let Some(rejected) = self.validate(&rules, &request.payload).await? {
            return Ok(rejected);
        }
        self.repository.update(id, &request.payload).await?;
        match self.settings.return_on_update {
            ReturnPolicy::SingleRecord => self.fetch(id).await,
            ReturnPolicy::AllRecords => self.list(&request.query).await,
            ReturnPolicy::Redirect => Ok(ResourceResponse::Success),
        }
    }

    pub async fn destroy(&self, id: i64, request: &ResourceRequest) -> Result<ResourceResponse, AppError> {
        if self.repository.has_delete_dependencies() {
            let blocked = DependencyGuard::check(self.repository.as_ref(), id).await?;
            if !blocked.is_empty() {
                return Ok(ResourceResponse::BadRequest(Rejection::Blocked(blocked)));
            }
        }
        self.repository.delete(id).await?;
        Ok(if request.background {
            ResourceResponse::Success
        } else {
            ResourceResponse::Redirect
        })
    }
}

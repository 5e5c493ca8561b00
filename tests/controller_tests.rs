//! Controller behaviour over the in-memory store: validation, response policies, uploads,
//! listing and guarded deletes.

mod common;

use async_trait::async_trait;
use common::{fields, shop_config, Fixture, MemoryStore, MemoryUploadSink};
use resource_scaffold::config::parse_resources;
use resource_scaffold::store::ExistenceQuery;
use resource_scaffold::{
    resolve, AppError, Collection, Entity, JsonPresenter, ListQuery, QueryParams, Rejection, Repository,
    RequestPayload, ResourceController, ResourceDefinition, ResourceRepository, ResourceRequest, ResourceResponse,
    ReturnPolicy, ScaffoldDefaults, UploadedFile,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn request(body: Value) -> ResourceRequest {
    ResourceRequest {
        payload: RequestPayload::from_fields(fields(body)),
        ..Default::default()
    }
}

fn params(pairs: &[(&str, &str)]) -> QueryParams {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn field_errors(response: &ResourceResponse) -> Vec<String> {
    match response {
        ResourceResponse::BadRequest(Rejection::Fields(errors)) => errors.keys().cloned().collect(),
        other => panic!("expected field errors, got {:?}", other),
    }
}

// ---------- fetch ----------

#[tokio::test]
async fn fetch_returns_projected_record_under_index_view() {
    let fx = Fixture::new(shop_config());
    fx.store
        .seed("customers", vec![json!({"id": 1, "name": "Ann", "email": "ann@x.io", "secret": "s"})])
        .await;

    let response = fx.controller("customers").fetch(1).await.unwrap();
    match response {
        ResourceResponse::Record { view, record } => {
            assert_eq!(view, "customers.index");
            assert_eq!(record["name"], "Ann");
            assert!(record.get("secret").is_none(), "hidden column must not be rendered");
        }
        other => panic!("unexpected response {:?}", other),
    }
}

#[tokio::test]
async fn fetch_missing_or_soft_deleted_is_not_found() {
    let fx = Fixture::new(shop_config());
    fx.store
        .seed(
            "customers",
            vec![json!({"id": 2, "name": "Bo", "deleted_at": "2026-01-01T00:00:00+00:00"})],
        )
        .await;

    let controller = fx.controller("customers");
    assert_eq!(controller.fetch(99).await.unwrap(), ResourceResponse::NotFound);
    assert_eq!(controller.fetch(2).await.unwrap(), ResourceResponse::NotFound);
}

// ---------- list ----------

#[tokio::test]
async fn list_keeps_native_columns_but_drops_hidden_ones() {
    let fx = Fixture::new(shop_config());
    fx.store
        .seed(
            "customers",
            vec![json!({"id": 1, "name": "Ann", "email": "ann@x.io", "secret": "hash"})],
        )
        .await;

    let response = fx.controller("customers").list(&QueryParams::new()).await.unwrap();
    match response {
        ResourceResponse::Collection { records, .. } => {
            assert_eq!(records, vec![json!({"id": 1, "name": "Ann", "email": "ann@x.io"})]);
        }
        other => panic!("unexpected response {:?}", other),
    }
}

#[tokio::test]
async fn list_applies_only_declared_filters() {
    let fx = Fixture::new(shop_config());
    fx.store
        .seed(
            "orders",
            vec![
                json!({"id": 1, "customer_id": 7, "total": 10}),
                json!({"id": 2, "customer_id": 8, "total": 10}),
                json!({"id": 3, "customer_id": 7, "total": 30}),
            ],
        )
        .await;

    // `total` is not filterable and is ignored.
    let response = fx
        .controller("orders")
        .list(&params(&[("customer_id", "7"), ("total", "30")]))
        .await
        .unwrap();
    match response {
        ResourceResponse::Collection {
            view,
            records,
            pagination_info,
        } => {
            assert_eq!(view, "orders.index");
            let ids: Vec<i64> = records.iter().filter_map(|r| r["id"].as_i64()).collect();
            assert_eq!(ids, vec![1, 3]);
            assert!(pagination_info.is_none());
        }
        other => panic!("unexpected response {:?}", other),
    }
}

#[tokio::test]
async fn paginated_list_reports_page_info() {
    let fx = Fixture::new(shop_config());
    fx.store
        .seed(
            "tags",
            vec![
                json!({"id": 1, "label": "a"}),
                json!({"id": 2, "label": "b"}),
                json!({"id": 3, "label": "c"}),
            ],
        )
        .await;

    let response = fx.controller("tags").list(&params(&[("page", "2")])).await.unwrap();
    match response {
        ResourceResponse::Collection {
            records,
            pagination_info: Some(info),
            ..
        } => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0]["label"], "c");
            assert_eq!(info.current_page, 2);
            assert_eq!(info.per_page, 2);
            assert_eq!(info.total, 3);
            assert_eq!(info.last_page, 2);
        }
        other => panic!("unexpected response {:?}", other),
    }
}

// ---------- create ----------

#[tokio::test]
async fn create_defaults_to_single_record() {
    let fx = Fixture::new(shop_config());
    let response = fx
        .controller("customers")
        .create(&request(json!({"name": "Ann", "email": "ann@x.io"})))
        .await
        .unwrap();
    match response {
        ResourceResponse::Record { record, .. } => {
            assert_eq!(record["id"], 1);
            assert_eq!(record["email"], "ann@x.io");
        }
        other => panic!("unexpected response {:?}", other),
    }
}

#[tokio::test]
async fn create_rejects_missing_and_taken_values() {
    let fx = Fixture::new(shop_config());
    fx.store
        .seed("customers", vec![json!({"id": 1, "name": "Ann", "email": "ann@x.io"})])
        .await;
    let controller = fx.controller("customers");

    let missing = controller.create(&request(json!({"email": "new@x.io"}))).await.unwrap();
    assert_eq!(field_errors(&missing), vec!["name"]);

    let taken = controller
        .create(&request(json!({"name": "Other", "email": "ann@x.io"})))
        .await
        .unwrap();
    assert_eq!(field_errors(&taken), vec!["email"]);
    assert_eq!(fx.store.rows("customers").await.len(), 1);
}

#[tokio::test]
async fn create_keeps_only_whitelisted_fields() {
    let fx = Fixture::new(shop_config());
    fx.controller("customers")
        .create(&request(json!({"name": "Ann", "email": "ann@x.io", "is_admin": true})))
        .await
        .unwrap();

    let row = fx.store.row("customers", 1).await.unwrap();
    assert_eq!(row["name"], "Ann");
    assert!(row.get("is_admin").is_none());
}

#[tokio::test]
async fn create_stores_uploads_in_their_column() {
    let fx = Fixture::new(shop_config());
    let mut req = request(json!({"name": "Ann", "email": "ann@x.io"}));
    req.payload = req.payload.with_file(
        "avatar_file",
        UploadedFile {
            file_name: "me.png".into(),
            content_type: Some("image/png".into()),
            bytes: vec![1, 2, 3],
        },
    );

    fx.controller("customers").create(&req).await.unwrap();

    let row = fx.store.row("customers", 1).await.unwrap();
    assert_eq!(row["avatar"], "customers/me.png");
    assert!(row.get("avatar_file").is_none());
    assert_eq!(fx.uploads.stored().await.len(), 1);
}

#[tokio::test]
async fn create_with_all_records_policy_returns_collection() {
    let fx = Fixture::new(shop_config());
    fx.store.seed("tags", vec![json!({"id": 1, "label": "a"})]).await;

    let response = fx.controller("tags").create(&request(json!({"label": "b"}))).await.unwrap();
    match response {
        ResourceResponse::Collection {
            records,
            pagination_info,
            ..
        } => {
            assert_eq!(records.len(), 2);
            assert!(pagination_info.is_some());
        }
        other => panic!("unexpected response {:?}", other),
    }
}

#[tokio::test]
async fn process_defaults_apply_when_controller_leaves_policy_unset() {
    let defaults = ScaffoldDefaults {
        return_on_store: ReturnPolicy::Redirect,
        return_on_update: ReturnPolicy::AllRecords,
    };
    let fx = Fixture::with_defaults(shop_config(), defaults);
    let orders = fx.controller("orders");

    let created = orders.create(&request(json!({"customer_id": 7}))).await.unwrap();
    assert_eq!(created, ResourceResponse::Redirect);

    let updated = orders.update(1, &request(json!({"customer_id": 8}))).await.unwrap();
    assert!(matches!(updated, ResourceResponse::Collection { .. }));

    // Explicit controller policy still wins.
    let tags = fx.controller("tags").create(&request(json!({"label": "a"}))).await.unwrap();
    assert!(matches!(tags, ResourceResponse::Collection { .. }));
}

// ---------- update ----------

#[tokio::test]
async fn update_unique_excludes_own_record() {
    let fx = Fixture::new(shop_config());
    fx.store
        .seed(
            "customers",
            vec![
                json!({"id": 3, "name": "Cy", "email": "a@x.io"}),
                json!({"id": 4, "name": "Di", "email": "b@x.io"}),
            ],
        )
        .await;
    let controller = fx.controller("customers");

    let same = controller
        .update(3, &request(json!({"name": "Cy", "email": "a@x.io"})))
        .await
        .unwrap();
    assert!(matches!(same, ResourceResponse::Record { .. }));

    let conflict = controller
        .update(3, &request(json!({"name": "Cy", "email": "b@x.io"})))
        .await
        .unwrap();
    assert_eq!(field_errors(&conflict), vec!["email"]);
    assert_eq!(fx.store.row("customers", 3).await.unwrap()["email"], "a@x.io");
}

#[tokio::test]
async fn update_missing_record_is_not_found() {
    let fx = Fixture::new(shop_config());
    let response = fx
        .controller("customers")
        .update(42, &request(json!({"name": "Nobody"})))
        .await
        .unwrap();
    assert_eq!(response, ResourceResponse::NotFound);
}

#[tokio::test]
async fn update_with_redirect_policy_reports_success() {
    let fx = Fixture::new(shop_config());
    fx.store.seed("tags", vec![json!({"id": 1, "label": "a"})]).await;

    let response = fx.controller("tags").update(1, &request(json!({"label": "z"}))).await.unwrap();
    assert_eq!(response, ResourceResponse::Success);
    assert_eq!(fx.store.row("tags", 1).await.unwrap()["label"], "z");
}

// ---------- destroy ----------

#[tokio::test]
async fn destroy_blocked_while_dependents_exist_then_allowed() {
    let fx = Fixture::new(shop_config());
    fx.store
        .seed("customers", vec![json!({"id": 7, "name": "Ann", "email": "ann@x.io"})])
        .await;
    fx.store
        .seed("orders", vec![json!({"id": 1, "customer_id": 7, "total": 5})])
        .await;
    let customers = fx.controller("customers");

    let blocked = customers.destroy(7, &ResourceRequest::default()).await.unwrap();
    assert_eq!(
        blocked,
        ResourceResponse::BadRequest(Rejection::Blocked(vec!["has orders".to_string()]))
    );
    assert!(customers.repository().has(7).await.unwrap());

    fx.controller("orders").destroy(1, &ResourceRequest::default()).await.unwrap();

    let allowed = customers.destroy(7, &ResourceRequest::default()).await.unwrap();
    assert_eq!(allowed, ResourceResponse::Redirect);
    assert!(!customers.repository().has(7).await.unwrap());
    // Soft delete keeps the row with its marker set.
    assert!(fx.store.row("customers", 7).await.unwrap()["deleted_at"].is_string());
}

#[tokio::test]
async fn destroy_reports_every_blocking_dependency_in_order() {
    let fx = Fixture::new(shop_config());
    fx.store.seed("customers", vec![json!({"id": 7, "name": "Ann"})]).await;
    fx.store.seed("orders", vec![json!({"id": 1, "customer_id": 7})]).await;
    fx.store.seed("invoices", vec![json!({"id": 1, "customer_id": 7})]).await;

    let response = fx
        .controller("customers")
        .destroy(7, &ResourceRequest::default())
        .await
        .unwrap();
    assert_eq!(
        response,
        ResourceResponse::BadRequest(Rejection::Blocked(vec![
            "has orders".to_string(),
            "has invoices".to_string()
        ]))
    );
}

#[tokio::test]
async fn soft_deleted_dependents_do_not_block() {
    let fx = Fixture::new(shop_config());
    fx.store.seed("customers", vec![json!({"id": 7, "name": "Ann"})]).await;
    fx.store
        .seed(
            "orders",
            vec![json!({"id": 1, "customer_id": 7, "deleted_at": "2026-01-01T00:00:00+00:00"})],
        )
        .await;

    let response = fx
        .controller("customers")
        .destroy(7, &ResourceRequest {
            background: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(response, ResourceResponse::Success);
}

#[tokio::test]
async fn destroy_of_missing_record_still_succeeds() {
    let fx = Fixture::new(shop_config());
    let response = fx.controller("tags").destroy(5, &ResourceRequest::default()).await.unwrap();
    assert_eq!(response, ResourceResponse::Redirect);
}

/// Customers without soft delete, guarded by two dependencies whose table/key pairs flatten to
/// the same `order_lines_customer_id`.
fn hard_delete_config() -> Value {
    json!([
        {
            "resource": {
                "name": "customers",
                "table": "customers",
                "data": ["name"],
                "delete_dependencies": [
                    { "tableName": "order_lines", "key": "customer_id", "message": "has order lines" },
                    { "tableName": "order", "key": "lines_customer_id", "message": "has order" }
                ]
            }
        }
    ])
}

#[tokio::test]
async fn dependencies_with_colliding_names_are_each_checked() {
    let fx = Fixture::new(hard_delete_config());
    fx.store
        .seed("customers", vec![json!({"id": 7, "name": "Ann"}), json!({"id": 8, "name": "Bo"})])
        .await;
    fx.store.seed("order_lines", vec![json!({"id": 1, "customer_id": 7})]).await;
    fx.store.seed("order", vec![json!({"id": 1, "lines_customer_id": 8})]).await;
    let customers = fx.controller("customers");

    let first = customers.destroy(7, &ResourceRequest::default()).await.unwrap();
    assert_eq!(
        first,
        ResourceResponse::BadRequest(Rejection::Blocked(vec!["has order lines".to_string()]))
    );
    assert!(fx.store.row("customers", 7).await.is_some());

    let second = customers.destroy(8, &ResourceRequest::default()).await.unwrap();
    assert_eq!(
        second,
        ResourceResponse::BadRequest(Rejection::Blocked(vec!["has order".to_string()]))
    );
    assert!(fx.store.row("customers", 8).await.is_some());
}

#[tokio::test]
async fn without_soft_delete_marked_dependents_block_and_delete_is_physical() {
    let fx = Fixture::new(hard_delete_config());
    fx.store
        .seed("customers", vec![json!({"id": 7, "name": "Ann"}), json!({"id": 9, "name": "Cy"})])
        .await;
    fx.store
        .seed(
            "order_lines",
            vec![json!({"id": 1, "customer_id": 7, "deleted_at": "2026-01-01T00:00:00+00:00"})],
        )
        .await;
    let customers = fx.controller("customers");

    let blocked = customers.destroy(7, &ResourceRequest::default()).await.unwrap();
    assert_eq!(
        blocked,
        ResourceResponse::BadRequest(Rejection::Blocked(vec!["has order lines".to_string()]))
    );

    let allowed = customers.destroy(9, &ResourceRequest::default()).await.unwrap();
    assert_eq!(allowed, ResourceResponse::Redirect);
    assert!(fx.store.row("customers", 9).await.is_none());
    assert!(fx.store.row("customers", 7).await.is_some());
}

/// Delegates to a real repository and counts existence probes.
struct CountingRepository {
    inner: ResourceRepository,
    probes: AtomicUsize,
}

#[async_trait]
impl Repository for CountingRepository {
    fn definition(&self) -> &ResourceDefinition {
        self.inner.definition()
    }

    async fn has(&self, id: i64) -> Result<bool, AppError> {
        self.inner.has(id).await
    }

    async fn fetch_projected(&self, id: i64) -> Result<Value, AppError> {
        self.inner.fetch_projected(id).await
    }

    async fn list(&self, query: &ListQuery) -> Result<Collection, AppError> {
        self.inner.list(query).await
    }

    async fn create(&self, payload: &RequestPayload) -> Result<Entity, AppError> {
        self.inner.create(payload).await
    }

    async fn update(&self, id: i64, payload: &RequestPayload) -> Result<Entity, AppError> {
        self.inner.update(id, payload).await
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.inner.delete(id).await
    }

    async fn exists(&self, query: &ExistenceQuery) -> Result<bool, AppError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(query).await
    }
}

#[tokio::test]
async fn destroy_without_dependencies_skips_the_guard() {
    let configs = parse_resources(&shop_config().to_string()).unwrap();
    let resolved = resolve(&configs, &ScaffoldDefaults::default())
        .unwrap()
        .into_iter()
        .find(|r| r.definition.name == "tags")
        .unwrap();
    let store = MemoryStore::new();
    store.seed("tags", vec![json!({"id": 1, "label": "a"})]).await;
    let repository = Arc::new(CountingRepository {
        inner: ResourceRepository::new(
            resolved.definition.clone(),
            Arc::new(store.clone()),
            Arc::new(MemoryUploadSink::default()),
        ),
        probes: AtomicUsize::new(0),
    });
    let controller = ResourceController::from_resolved(resolved, repository.clone(), Arc::new(JsonPresenter));

    let response = controller.destroy(1, &ResourceRequest::default()).await.unwrap();
    assert_eq!(response, ResourceResponse::Redirect);
    assert_eq!(repository.probes.load(Ordering::SeqCst), 0);
    assert!(store.row("tags", 1).await.is_none());
}

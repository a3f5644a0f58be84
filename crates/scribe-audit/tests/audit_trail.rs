//! End-to-end tests for the audit trail.
//!
//! A small in-memory product repository is wrapped in an
//! `AuditedRepository` and driven through a typical lifecycle; the
//! resulting trail is read back from a JSON Lines file.
//!
//! Run with: cargo test --package scribe-audit --test audit_trail

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use scribe_audit::{
    AuditAction, AuditFilter, AuditService, AuditSink, AuditedRepository, JsonLinesSink,
    MemorySink, OMITTED_MARKER, Repository, RepositoryContext, SnapshotSource, TaskActor,
    TypeRegistry,
};
use scribe_core::{AttributeError, AuditValue, Auditable, EntitySchema, ObjectRef, ScribeConfig};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
struct Category {
    name: String,
    parent: Option<Arc<Category>>,
}

impl Category {
    fn path(names: &[&str]) -> Option<Arc<Category>> {
        let (first, rest) = names.split_first()?;
        Some(Arc::new(Category {
            name: first.to_string(),
            parent: Category::path(rest),
        }))
    }
}

impl Auditable for Category {
    fn schema(&self) -> EntitySchema {
        EntitySchema::builder("Category")
            .attribute("name")
            .attribute("parent")
            .build()
    }

    fn attribute(&self, name: &str) -> Result<AuditValue, AttributeError> {
        match name {
            "name" => Ok(self.name.as_str().into()),
            "parent" => Ok(self.parent.clone().map(ObjectRef::from_arc).into()),
            other => Err(AttributeError::not_found(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Product {
    id: Option<u64>,
    sku: String,
    price: BigDecimal,
    archived: bool,
    category: Option<Arc<Category>>,
    updated_by: Option<String>,
}

impl Product {
    fn new(sku: &str, price: &str) -> Self {
        Self {
            id: None,
            sku: sku.to_string(),
            price: BigDecimal::from_str(price).unwrap(),
            archived: false,
            category: None,
            updated_by: None,
        }
    }
}

impl Auditable for Product {
    fn schema(&self) -> EntitySchema {
        EntitySchema::builder("Product")
            .identity("id")
            .natural_key("sku")
            .attribute("price")
            .attribute("archived")
            .attribute("category")
            .last_modified_by("updated_by")
            .build()
    }

    fn attribute(&self, name: &str) -> Result<AuditValue, AttributeError> {
        match name {
            "id" => Ok(self.id.into()),
            "sku" => Ok(self.sku.as_str().into()),
            "price" => Ok(self.price.clone().into()),
            "archived" => Ok(self.archived.into()),
            "category" => Ok(self.category.clone().map(ObjectRef::from_arc).into()),
            "updated_by" => Ok(self.updated_by.clone().into()),
            other => Err(AttributeError::not_found(other)),
        }
    }
}

#[derive(Default)]
struct ProductRepository {
    rows: RwLock<HashMap<u64, Product>>,
}

#[async_trait]
impl SnapshotSource for ProductRepository {
    async fn find_by_id(&self, id: &AuditValue) -> anyhow::Result<Option<ObjectRef>> {
        let rows = self.rows.read().unwrap();
        Ok(rows
            .values()
            .find(|p| AuditValue::from(p.id) == *id)
            .cloned()
            .map(ObjectRef::new))
    }
}

impl RepositoryContext for ProductRepository {
    fn snapshot_source(&self) -> Option<&dyn SnapshotSource> {
        Some(self)
    }
}

#[async_trait]
impl Repository for ProductRepository {
    type Entity = Product;

    fn entity_name(&self) -> &str {
        "Product"
    }

    async fn save(&self, mut product: Product) -> anyhow::Result<Product> {
        let mut rows = self.rows.write().unwrap();
        let id = product.id.unwrap_or(rows.len() as u64 + 1);
        product.id = Some(id);
        rows.insert(id, product.clone());
        Ok(product)
    }

    async fn delete(&self, product: &Product) -> anyhow::Result<()> {
        if let Some(id) = product.id {
            self.rows.write().unwrap().remove(&id);
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: &AuditValue) -> anyhow::Result<()> {
        self.rows
            .write()
            .unwrap()
            .retain(|_, p| AuditValue::from(p.id) != *id);
        Ok(())
    }
}

fn file_backed(path: &std::path::Path) -> AuditedRepository<ProductRepository> {
    let yaml = format!(
        r#"
project: catalog
audit:
  soft_delete_field: archived
  storage:
    backend: file
    file_path: "{}"
"#,
        path.display()
    );
    let config = ScribeConfig::from_yaml(&yaml).unwrap();
    let audit = AuditService::new(
        config.audit,
        Arc::new(TypeRegistry::new()),
        Arc::new(TaskActor),
    )
    .unwrap();

    AuditedRepository::new(ProductRepository::default(), Arc::new(audit))
}

fn in_memory() -> AuditedRepository<ProductRepository> {
    let mut config = ScribeConfig::default().audit;
    config.soft_delete_field = "archived".to_string();
    let audit = AuditService::with_sink(
        config,
        Arc::new(TypeRegistry::new()),
        Arc::new(TaskActor),
        Arc::new(MemorySink::new()),
    );
    AuditedRepository::new(ProductRepository::default(), Arc::new(audit))
}

fn read_lines(path: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_product_lifecycle_in_json_lines() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let repo = file_backed(&path);

    let product = TaskActor::scope("carol", async {
        let created = repo.save(Product::new("TEA-001", "19.90")).await.unwrap();

        let mut repriced = created.clone();
        repriced.price = BigDecimal::from_str("24.50").unwrap();
        let repriced = repo.save(repriced).await.unwrap();

        let mut archived = repriced.clone();
        archived.archived = true;
        repo.save(archived).await.unwrap()
    })
    .await;

    repo.delete_by_id(&AuditValue::from(product.id)).await.unwrap();

    let lines = read_lines(&path);
    let actions: Vec<&str> = lines.iter().map(|l| l["action"].as_str().unwrap()).collect();
    assert_eq!(actions, vec!["INSERT", "UPDATE", "SOFT_DELETE", "DELETE"]);

    let auditors: Vec<&str> = lines.iter().map(|l| l["auditor"].as_str().unwrap()).collect();
    assert_eq!(auditors, vec!["carol", "carol", "carol", "SYSTEM"]);

    for (index, line) in lines.iter().enumerate() {
        assert_eq!(line["id"], json!(index + 1));
        assert_eq!(line["entityClassName"], json!("Product"));
        assert_eq!(line["entityId"], json!("1"));
        assert_eq!(line["entityNaturalId"], json!("TEA-001"));
    }

    assert!(lines[0].get("affectedFields").is_none());
    let fields = lines[1]["affectedFields"].as_array().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["fieldName"], json!("price"));

    // Decimal scale survives the round trip through the file.
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains(r#""before":19.90"#));
    assert!(raw.contains(r#""after":24.50"#));
}

#[tokio::test]
async fn test_reopened_file_keeps_history() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.log");

    {
        let repo = file_backed(&path);
        repo.save(Product::new("MUG-7", "8.00")).await.unwrap();
    }

    let sink = JsonLinesSink::open(&path).unwrap();
    let repo = file_backed(&path);
    repo.save(Product::new("CUP-2", "4.00")).await.unwrap();

    let history = sink.query(AuditFilter::default()).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].entity_natural_id.as_deref(), Some("MUG-7"));

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["id"], json!(2));
}

#[tokio::test]
async fn test_soft_restore_and_silent_resave() {
    init_tracing();
    let repo = in_memory();

    let mut product = Product::new("PEN-3", "1.20");
    product.archived = true;
    let product = repo.save(product).await.unwrap();

    repo.save(product.clone()).await.unwrap();

    let mut restored = product.clone();
    restored.archived = false;
    repo.save(restored).await.unwrap();

    let trail = repo
        .audit()
        .query(AuditFilter::for_entity("Product", "1"))
        .await
        .unwrap();
    let actions: Vec<AuditAction> = trail.iter().map(|r| r.action).collect();
    assert_eq!(actions, vec![AuditAction::Insert, AuditAction::SoftRestore]);
}

#[tokio::test]
async fn test_bookkeeping_changes_are_not_audited() {
    init_tracing();
    let repo = in_memory();
    let product = repo.save(Product::new("INK-9", "3.00")).await.unwrap();

    let mut touched = product.clone();
    touched.updated_by = Some("cron".to_string());
    repo.save(touched).await.unwrap();

    assert_eq!(repo.audit().count(AuditFilter::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_deep_category_is_bounded() {
    init_tracing();
    let repo = in_memory();
    let product = repo.save(Product::new("OOL-1", "6.00")).await.unwrap();

    let mut categorised = product.clone();
    categorised.category = Category::path(&["Oolong", "Tea", "Drinks", "Grocery"]);
    repo.save(categorised).await.unwrap();

    let update = repo.audit().get(2).await.unwrap().unwrap();
    assert_eq!(update.action, AuditAction::Update);

    let fields = update.affected_fields.unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].field_name, "category");
    assert_eq!(fields[0].before, json!("NULL"));
    assert_eq!(
        fields[0].after,
        json!({
            "name": "Oolong",
            "parent": {
                "name": "Tea",
                "parent": OMITTED_MARKER
            }
        })
    );
}

#[tokio::test]
async fn test_delete_by_unknown_id() {
    init_tracing();
    let repo = in_memory();

    repo.delete_by_id(&AuditValue::from(404u64)).await.unwrap();

    let record = repo.audit().get(1).await.unwrap().unwrap();
    assert_eq!(record.action, AuditAction::Delete);
    assert_eq!(record.entity_class_name, "Product");
    assert_eq!(record.entity_id, "404");
    assert_eq!(record.auditor, "SYSTEM");
    assert!(record.entity_natural_id.is_none());
}

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use tillstack_api::app::{AppServices, build_app};
use tillstack_auth::{JwtClaims, Role};
use tillstack_core::{TenantId, UserId};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory store, on an ephemeral port.
        let app = build_app(JWT_SECRET.to_string(), AppServices::in_memory());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn put(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .put(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn delete(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .delete(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        read(res).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read(res: reqwest::Response) -> (StatusCode, Value) {
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    let body = serde_json::from_str(&text).unwrap_or(Value::Null);
    (status, body)
}

fn mint_jwt(tenant_id: TenantId, roles: &[&'static str]) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        tenant_id,
        roles: roles.iter().map(|r| Role::new(*r)).collect(),
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn id(body: &Value) -> String {
    body["id"].as_str().expect("response has an id").to_string()
}

/// Category plus one product with `stock` units at `price` cents.
async fn seed_product(srv: &TestServer, token: &str, sku: &str, stock: i64, price: i64) -> String {
    let (status, category) = srv
        .post(token, "/categories", json!({ "name": format!("Cat {sku}"), "color": "#336699" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{category}");

    let (status, product) = srv
        .post(
            token,
            "/products",
            json!({
                "sku": sku,
                "name": format!("Product {sku}"),
                "category_id": id(&category),
                "stock": stock,
                "price": price,
                "cost_price": price / 2,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    id(&product)
}

#[tokio::test]
async fn health_is_public_and_everything_else_needs_a_token() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .get(format!("{}/products", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = srv.get("not-a-jwt", "/products").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn tenant_context_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let tenant_id = TenantId::new();
    let token = mint_jwt(tenant_id, &["admin"]);

    let (status, body) = srv.get(&token, "/whoami").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant_id"].as_str().unwrap(), tenant_id.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn sale_lifecycle_moves_stock_and_register_totals() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(TenantId::new(), &["admin"]);
    let product = seed_product(&srv, &token, "COLA-1", 10, 250).await;

    // No register yet.
    let (status, body) = srv
        .post(&token, "/sales", json!({ "items": [{ "product_id": product, "quantity": 1 }] }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invariant_violation");

    let (status, register) = srv
        .post(&token, "/cash-registers", json!({ "opening_amount": 1000 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let register_id = id(&register);

    let (status, again) = srv
        .post(&token, "/cash-registers", json!({ "opening_amount": 0 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{again}");

    // The submitted unit price is ignored.
    let (status, sale) = srv
        .post(
            &token,
            "/sales",
            json!({ "items": [{ "product_id": product, "quantity": 3, "unit_price": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");
    assert_eq!(sale["total"], 750);
    assert_eq!(sale["items"][0]["unit_price"], 250);

    let (_, stored) = srv.get(&token, &format!("/products/{product}")).await;
    assert_eq!(stored["stock"], 7);

    let (status, current) = srv.get(&token, "/cash-registers/current").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["total_sales"], 750);
    assert_eq!(current["sales_count"], 1);

    // Too much stock requested: nothing changes.
    let (status, _) = srv
        .post(&token, "/sales", json!({ "items": [{ "product_id": product, "quantity": 8 }] }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (_, stored) = srv.get(&token, &format!("/products/{product}")).await;
    assert_eq!(stored["stock"], 7);

    // Annul restores stock and totals, once.
    let sale_id = id(&sale);
    let (status, annulled) = srv.delete(&token, &format!("/sales/{sale_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(annulled["annulled_at"].is_string());
    let (status, _) = srv.delete(&token, &format!("/sales/{sale_id}")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, stored) = srv.get(&token, &format!("/products/{product}")).await;
    assert_eq!(stored["stock"], 10);

    let (status, closed) = srv
        .post(&token, &format!("/cash-registers/{register_id}/close"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["closing_amount"], 1000);

    let (_, overview) = srv.get(&token, "/cash-registers").await;
    assert!(overview["current"].is_null());
    assert_eq!(overview["history"]["total"], 1);
}

#[tokio::test]
async fn expenses_follow_their_register() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(TenantId::new(), &["admin"]);

    let (_, register) = srv
        .post(&token, "/cash-registers", json!({ "opening_amount": 5000 }))
        .await;
    let register_id = id(&register);

    let (status, expense) = srv
        .post(
            &token,
            "/expenses",
            json!({ "cash_register_id": register_id, "amount": 1200, "description": "Ice" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{expense}");
    let expense_id = id(&expense);

    let (status, _) = srv
        .put(
            &token,
            &format!("/expenses/{expense_id}"),
            json!({ "cash_register_id": register_id, "amount": 800, "description": "Ice" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, current) = srv.get(&token, "/cash-registers/current").await;
    assert_eq!(current["total_expenses"], 800);
    assert_eq!(current["expected_closing"], 4200);

    let (status, _) = srv.delete(&token, &format!("/expenses/{expense_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, current) = srv.get(&token, "/cash-registers/current").await;
    assert_eq!(current["total_expenses"], 0);

    let (status, body) = srv
        .post(
            &token,
            "/expenses",
            json!({ "cash_register_id": register_id, "amount": 0, "description": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["field"].as_str())
        .collect();
    assert!(fields.contains(&"amount"));
    assert!(fields.contains(&"description"));
}

#[tokio::test]
async fn cashier_can_sell_but_not_manage_catalog() {
    let srv = TestServer::spawn().await;
    let tenant = TenantId::new();
    let admin = mint_jwt(tenant, &["admin"]);
    let cashier = mint_jwt(tenant, &["cashier"]);
    let product = seed_product(&srv, &admin, "BREAD", 5, 100).await;

    let (status, body) = srv
        .post(&cashier, "/categories", json!({ "name": "Snacks", "color": "#000000" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = srv
        .post(&cashier, "/cash-registers", json!({ "opening_amount": 0 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, sale) = srv
        .post(&cashier, "/sales", json!({ "items": [{ "product_id": product, "quantity": 2 }] }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = srv.delete(&cashier, &format!("/sales/{}", id(&sale))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Reads need no permission.
    let (status, products) = srv.get(&cashier, "/products/search?term=br").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn tenant_isolation_hides_other_companies_records() {
    let srv = TestServer::spawn().await;
    let token1 = mint_jwt(TenantId::new(), &["admin"]);
    let token2 = mint_jwt(TenantId::new(), &["admin"]);
    let product = seed_product(&srv, &token1, "SKU-1", 3, 100).await;

    let (status, _) = srv.get(&token2, &format!("/products/{product}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv.delete(&token2, &format!("/products/{product}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = srv.get(&token2, "/products").await;
    assert_eq!(list["total"], 0);

    // The same SKU is free in another company.
    seed_product(&srv, &token2, "SKU-1", 1, 100).await;
    let (_, categories) = srv.get(&token1, "/categories").await;
    let (status, dup) = srv
        .post(
            &token1,
            "/products",
            json!({
                "sku": "sku-1",
                "name": "Dup",
                "category_id": categories["items"][0]["id"],
                "price": 1,
                "cost_price": 1,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{dup}");

    let (status, _) = srv.get(&token1, "/products/not-an-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn documents_render_from_templates() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(TenantId::new(), &["admin"]);

    let (status, template) = srv
        .post(
            &token,
            "/document-templates",
            json!({
                "name": "Delivery note",
                "content": "<p>Deliver to {{ customer }} on {{ day }}</p>",
                "fields": [
                    { "name": "customer", "type": "text" },
                    { "name": "day", "type": "date" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{template}");
    let template_id = id(&template);

    let (status, body) = srv
        .post(
            &token,
            &format!("/document-templates/{template_id}/documents"),
            json!({ "data": { "customer": "Ann", "day": "31/12/2024" } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, document) = srv
        .post(
            &token,
            &format!("/document-templates/{template_id}/documents"),
            json!({ "data": { "customer": "<Ann>", "day": "2024-12-31" } }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{document}");

    let (status, rendered) = srv.get(&token, &format!("/documents/{}", id(&document))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rendered["content"], "<p>Deliver to &lt;Ann&gt; on 2024-12-31</p>");

    let (status, copy) = srv
        .post(&token, &format!("/document-templates/{template_id}/duplicate"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(copy["name"], "Delivery note (Copy)");
}

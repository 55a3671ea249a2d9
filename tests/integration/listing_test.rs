//! Read paths and direct deal/ticket creation through the backend facade

mod common;

use common::{deal, registration, ticket, TestApp};
use crmsync_hubspot::{DealInput, DealStage, MockCrm, MockFailure, ObjectKind};

// LST-I01: One contact without deals lists with an empty deal list and no cursor
#[tokio::test]
async fn test_list_single_contact_without_deals() {
    let app = TestApp::new().unwrap();
    app.backend
        .register_user(registration("a@b.com", vec![]))
        .await
        .unwrap();

    let page = app.backend.list_contacts(Some(1), None).await.unwrap();

    assert_eq!(page.contacts.len(), 1);
    assert!(page.contacts[0].deals.is_empty());
    assert_eq!(page.next_cursor, None);
    assert_eq!(
        page.contacts[0].properties.get_text("email").as_deref(),
        Some("a@b.com")
    );

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["contacts"][0]["deals"], serde_json::json!([]));
    assert!(json["next_cursor"].is_null());
}

// LST-I02: Ticket fields round-trip through the CRM under their local names
#[tokio::test]
async fn test_ticket_fields_round_trip() {
    let app = TestApp::new().unwrap();
    app.backend
        .register_user(registration("a@b.com", vec![deal("D1", vec![ticket("S1")])]))
        .await
        .unwrap();

    let page = app.backend.list_contacts(None, None).await.unwrap();
    let ticket = &page.contacts[0].deals[0].tickets[0];

    assert_eq!(ticket.properties.get_text("subject").as_deref(), Some("S1"));
    assert_eq!(ticket.properties.get_text("description").as_deref(), Some("x"));
    assert_eq!(
        ticket.properties.get_text("category").as_deref(),
        Some("BILLING_ISSUE")
    );
    assert_eq!(ticket.properties.get_text("pipeline").as_deref(), Some("p1"));
    assert!(!ticket.properties.contains_key("content"));
    assert!(!ticket.properties.contains_key("hs_ticket_category"));
    assert!(!ticket.properties.contains_key("hs_pipeline"));
}

// LST-I03: Paging across registrations with the default page size
#[tokio::test]
async fn test_list_contacts_pages() {
    let app = TestApp::new().unwrap();
    for i in 0..12 {
        app.backend
            .register_user(registration(&format!("user{i}@b.com"), vec![]))
            .await
            .unwrap();
    }

    let first = app.backend.list_contacts(None, None).await.unwrap();
    assert_eq!(first.contacts.len(), 10);
    let cursor = first.next_cursor.expect("expected a second page");

    let second = app
        .backend
        .list_contacts(None, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(second.contacts.len(), 2);
    assert_eq!(second.next_cursor, None);
}

// LST-I04: Fan-out failure surfaces as an error body
#[tokio::test]
async fn test_list_contacts_read_failure() {
    let app = TestApp::new().unwrap();
    app.backend
        .register_user(registration("a@b.com", vec![deal("D1", vec![])]))
        .await
        .unwrap();
    app.crm.fail(MockFailure::Read(ObjectKind::Deals));

    let body = app.backend.list_contacts(None, None).await.unwrap_err();
    assert!(body.error.starts_with("CRM response error (503)"));
}

// LST-I05: Pipelines and stages come back sorted
#[tokio::test]
async fn test_pipeline_listings() {
    let app = TestApp::new().unwrap();

    let tickets = app.backend.list_pipeline_tickets().await.unwrap();
    assert_eq!(tickets[0].label, "Support Pipeline");
    let orders: Vec<i32> = tickets[0].stages.iter().map(|s| s.display_order).collect();
    let mut sorted = orders.clone();
    sorted.sort();
    assert_eq!(orders, sorted);

    let deals = app.backend.list_deal_stages().await.unwrap();
    assert_eq!(deals[0].stages.len(), 7);
    assert_eq!(deals[0].stages[5].id, DealStage::ClosedWon.as_str());
}

// LST-I06: Direct deal and ticket creation for an existing contact
#[tokio::test]
async fn test_create_deal_and_ticket_directly() {
    let app = TestApp::new().unwrap();
    let registration = app
        .backend
        .register_user(registration("a@b.com", vec![]))
        .await
        .unwrap();

    let deal_id = app
        .backend
        .create_deal(
            &registration.contact_id,
            DealInput::new("Upsell", 300.0, DealStage::DecisionMakerBoughtIn),
        )
        .await
        .unwrap();
    let again = app
        .backend
        .create_deal(
            &registration.contact_id,
            DealInput::new("Upsell", 350.0, DealStage::ContractSent),
        )
        .await
        .unwrap();
    assert_eq!(deal_id, again);

    let first = app
        .backend
        .create_ticket(&registration.contact_id, &deal_id, ticket("Help"))
        .await
        .unwrap();
    let second = app
        .backend
        .create_ticket(&registration.contact_id, &deal_id, ticket("Help"))
        .await
        .unwrap();
    assert_ne!(first, second);

    let page = app.backend.list_contacts(None, None).await.unwrap();
    assert_eq!(page.contacts[0].deals[0].tickets.len(), 2);
}

// LST-I07: Expired CRM tokens are renewed once before the next call
#[tokio::test]
async fn test_expired_token_renewed_per_call() {
    let app = TestApp::with_crm(MockCrm::new().with_token_ttl(0)).unwrap();

    app.backend.list_pipeline_tickets().await.unwrap();
    app.backend.list_deal_stages().await.unwrap();

    assert_eq!(app.crm.token_exchanges(), 2);
}

// LST-I08: Ticket for an unknown deal is rejected by the CRM
#[tokio::test]
async fn test_ticket_for_unknown_deal_fails() {
    let app = TestApp::new().unwrap();
    let registration = app
        .backend
        .register_user(registration("a@b.com", vec![]))
        .await
        .unwrap();

    let body = app
        .backend
        .create_ticket(&registration.contact_id, "424242", ticket("Orphan"))
        .await
        .unwrap_err();

    assert!(body.error.contains("404"));
    assert!(app.crm.objects(ObjectKind::Tickets).is_empty());
}

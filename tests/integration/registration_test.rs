//! Registration scenarios driven through the backend facade

mod common;

use common::{deal, registration, ticket, TestApp};
use crmsync_accounts::{SyncStatus, UserStore};
use crmsync_hubspot::{MockCall, MockFailure, ObjectKind, UpsertAction};

// REG-I01: One contact, one linked deal, one ticket linked to both
#[tokio::test]
async fn test_register_creates_linked_contact_deal_ticket() {
    let app = TestApp::new().unwrap();

    let result = app
        .backend
        .register_user(registration("a@b.com", vec![deal("D1", vec![ticket("S1")])]))
        .await
        .unwrap();

    let contacts = app.crm.objects(ObjectKind::Contacts);
    let deals = app.crm.objects(ObjectKind::Deals);
    let tickets = app.crm.objects(ObjectKind::Tickets);
    assert_eq!(contacts.len(), 1);
    assert_eq!(deals.len(), 1);
    assert_eq!(tickets.len(), 1);

    assert_eq!(result.contact_id, contacts[0].id);
    assert_eq!(
        app.crm
            .associated_ids(ObjectKind::Deals, &deals[0].id, ObjectKind::Contacts),
        vec![contacts[0].id.clone()]
    );
    assert_eq!(
        app.crm
            .associated_ids(ObjectKind::Tickets, &tickets[0].id, ObjectKind::Deals),
        vec![deals[0].id.clone()]
    );
    assert_eq!(
        app.crm
            .associated_ids(ObjectKind::Tickets, &tickets[0].id, ObjectKind::Contacts),
        vec![contacts[0].id.clone()]
    );

    assert!(result.report.is_complete());
    assert_eq!(result.report.contact_action, UpsertAction::Created);

    let account = app.users.find_by_email("a@b.com").await.unwrap().unwrap();
    assert_eq!(account.contact_id.as_deref(), Some(result.contact_id.as_str()));
}

// REG-I02: Contact failure creates nothing downstream and rolls back the account
#[tokio::test]
async fn test_contact_failure_compensates() {
    let app = TestApp::new().unwrap();
    app.crm.fail(MockFailure::Create(ObjectKind::Contacts));

    let body = app
        .backend
        .register_user(registration("a@b.com", vec![deal("D1", vec![ticket("S1")])]))
        .await
        .unwrap_err();

    assert_eq!(body.error, "Failed to create account");
    assert!(app.users.find_by_email("a@b.com").await.unwrap().is_none());
    assert!(app.crm.objects(ObjectKind::Deals).is_empty());
    assert!(app.crm.objects(ObjectKind::Tickets).is_empty());

    // The same email can register once the CRM recovers.
    app.crm.clear_failures();
    assert!(app
        .backend
        .register_user(registration("a@b.com", vec![]))
        .await
        .is_ok());
}

// REG-I03: Token exchange failure is a contact failure
#[tokio::test]
async fn test_token_failure_compensates() {
    let app = TestApp::new().unwrap();
    app.crm.fail(MockFailure::TokenExchange);

    let body = app
        .backend
        .register_user(registration("a@b.com", vec![]))
        .await
        .unwrap_err();

    assert_eq!(body.error, "Failed to create account");
    assert!(app.users.find_by_email("a@b.com").await.unwrap().is_none());
}

// REG-I04: One failing deal among two; the other and its tickets still sync
#[tokio::test]
async fn test_partial_deal_failure_is_reported() {
    let app = TestApp::new().unwrap();
    app.crm.fail(MockFailure::CreateWhere {
        kind: ObjectKind::Deals,
        property: "dealname".to_string(),
        value: "Broken".to_string(),
    });

    let result = app
        .backend
        .register_user(registration(
            "a@b.com",
            vec![
                deal("Broken", vec![ticket("never")]),
                deal("D2", vec![ticket("S2")]),
            ],
        ))
        .await
        .unwrap();

    let report = &result.report;
    assert!(matches!(report.deals[0].status, SyncStatus::Failed { .. }));
    assert!(report.deals[0].tickets.is_empty());
    assert!(matches!(report.deals[1].status, SyncStatus::Created { .. }));
    assert!(matches!(
        report.deals[1].tickets[0].status,
        SyncStatus::Created { .. }
    ));

    assert_eq!(app.crm.objects(ObjectKind::Deals).len(), 1);
    assert_eq!(app.crm.objects(ObjectKind::Tickets).len(), 1);
    assert_eq!(
        app.crm.count(|c| matches!(
            c,
            MockCall::Create {
                kind: ObjectKind::Tickets,
                ..
            }
        )),
        1
    );
}

// REG-I05: Duplicate registration is rejected before touching the CRM
#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let app = TestApp::new().unwrap();
    app.backend
        .register_user(registration("a@b.com", vec![]))
        .await
        .unwrap();
    let calls_before = app.crm.recorded_calls().len();

    let body = app
        .backend
        .register_user(registration("A@B.COM", vec![]))
        .await
        .unwrap_err();

    assert_eq!(body.error, "User already exists");
    assert_eq!(app.crm.recorded_calls().len(), calls_before);
}

// REG-I06: An existing CRM contact is updated, not duplicated
#[tokio::test]
async fn test_registration_reuses_existing_contact() {
    let app = TestApp::new().unwrap();
    let existing = app.crm.insert_object(
        ObjectKind::Contacts,
        crmsync_hubspot::PropertyMap::new()
            .with("email", "a@b.com")
            .with("firstname", "Old"),
    );

    let result = app
        .backend
        .register_user(registration("a@b.com", vec![]))
        .await
        .unwrap();

    assert_eq!(result.contact_id, existing);
    assert_eq!(result.report.contact_action, UpsertAction::Updated);
    let contact = app.crm.object(ObjectKind::Contacts, &existing).unwrap();
    assert_eq!(
        contact.properties.get_text("firstname").as_deref(),
        Some("Ada")
    );
}

// REG-I07: Registration payload parses from JSON with nested deals and tickets
#[tokio::test]
async fn test_registration_from_json_payload() {
    let app = TestApp::new().unwrap();
    let request = serde_json::from_value(serde_json::json!({
        "email": "grace@example.com",
        "password": "hunter22",
        "firstname": "Grace",
        "lastname": "Hopper",
        "phone": "555",
        "deals": [{
            "dealname": "Compiler",
            "amount": 5000,
            "dealstage": "contractsent",
            "tickets": [{
                "subject": "Bug",
                "description": "moth in relay",
                "category": "PRODUCT_ISSUE",
                "pipeline": "0",
                "hs_ticket_priority": "HIGH",
                "hs_pipeline_stage": "1"
            }]
        }]
    }))
    .unwrap();

    let result = app.backend.register_user(request).await.unwrap();
    assert!(result.report.is_complete());

    let ticket = &app.crm.objects(ObjectKind::Tickets)[0];
    assert_eq!(
        ticket.properties.get_text("content").as_deref(),
        Some("moth in relay")
    );
    assert_eq!(
        ticket.properties.get_text("hs_ticket_category").as_deref(),
        Some("PRODUCT_ISSUE")
    );
}

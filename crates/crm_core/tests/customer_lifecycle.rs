use crm_core::{
    AddressPayload, Customer, CustomerDraft, CustomerRepository, CustomerRequest,
    CustomerService, CustomerServiceError, CustomerStatus, CustomerStore, RepoError,
    RequestValidationError, SqliteCustomerRepository, SqliteCustomerStore, TxMode,
};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use uuid::Uuid;

fn service() -> CustomerService<SqliteCustomerStore> {
    CustomerService::new(SqliteCustomerStore::open_in_memory().unwrap())
}

fn request(name: &str, email: &str) -> CustomerRequest {
    CustomerRequest {
        name: name.to_string(),
        email: email.to_string(),
        ..CustomerRequest::default()
    }
}

fn draft_customer(name: &str, email: &str) -> Customer {
    Customer::new(
        CustomerDraft {
            name: name.to_string(),
            email: email.to_string(),
            ..CustomerDraft::default()
        },
        1_000,
    )
    .unwrap()
}

fn stored_count(service: &CustomerService<SqliteCustomerStore>) -> usize {
    SqliteCustomerRepository::try_new(service.store().connection())
        .unwrap()
        .list_all()
        .unwrap()
        .len()
}

fn pause_for_clock() {
    thread::sleep(Duration::from_millis(5));
}

#[test]
fn create_read_update_delete_scenario() {
    let mut service = service();

    let created = service
        .create_customer(&request("John Doe", "john@x.com"))
        .unwrap();
    let id = created.id.expect("created customer should carry an id");
    assert_eq!(created.status, CustomerStatus::Active);
    assert_eq!(created.created_at, created.updated_at);

    let err = service
        .create_customer(&request("Jane", "john@x.com"))
        .unwrap_err();
    assert!(matches!(err, CustomerServiceError::Conflict { ref email } if email == "john@x.com"));
    assert_eq!(stored_count(&service), 1);

    pause_for_clock();
    let updated = service
        .update_customer(id, &request("John Doe", "jane@x.com"))
        .unwrap();
    assert_eq!(updated.id, Some(id));
    assert_eq!(updated.email, "jane@x.com");
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);

    service.delete_customer(id).unwrap();
    let err = service.get_customer(id).unwrap_err();
    assert!(matches!(
        err,
        CustomerServiceError::NotFound { entity: "Customer", field: "id", ref value }
            if *value == id.to_string()
    ));
}

#[test]
fn creates_with_distinct_emails_get_distinct_ids() {
    let mut service = service();

    let first = service.create_customer(&request("A", "a@x.com")).unwrap();
    let second = service.create_customer(&request("A", "b@x.com")).unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(service.list_customers().unwrap(), vec![first, second]);
}

#[test]
fn create_copies_optional_fields_verbatim() {
    let mut service = service();
    let mut input = request("John", "john@x.com");
    input.company = Some("Acme Corp".to_string());
    input.address = Some(AddressPayload {
        street: Some("123 Main St".to_string()),
        country: Some("USA".to_string()),
        ..AddressPayload::default()
    });

    let created = service.create_customer(&input).unwrap();
    assert_eq!(created.company.as_deref(), Some("Acme Corp"));
    assert_eq!(created.phone, None);
    assert_eq!(created.address, input.address);

    let fetched = service.get_customer(created.id.unwrap()).unwrap();
    assert_eq!(fetched, created);
}

#[test]
fn invalid_requests_fail_before_touching_the_store() {
    let mut service = service();

    let err = service.create_customer(&request("", "a@x.com")).unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(
        err,
        CustomerServiceError::InvalidRequest(RequestValidationError::BlankField("name"))
    ));

    let err = service
        .create_customer(&request("Ada", "not-an-email"))
        .unwrap_err();
    assert!(matches!(
        err,
        CustomerServiceError::InvalidRequest(RequestValidationError::MalformedEmail(_))
    ));
    assert_eq!(stored_count(&service), 0);

    let created = service.create_customer(&request("Ada", "ada@x.com")).unwrap();
    let err = service
        .update_customer(created.id.unwrap(), &request("Ada", " "))
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn update_keeping_own_email_succeeds() {
    let mut service = service();
    let created = service.create_customer(&request("John", "john@x.com")).unwrap();
    let id = created.id.unwrap();

    let mut renamed = request("Johnny", "john@x.com");
    renamed.phone = Some("+1-555-0001".to_string());
    let updated = service.update_customer(id, &renamed).unwrap();

    assert_eq!(updated.name, "Johnny");
    assert_eq!(updated.phone.as_deref(), Some("+1-555-0001"));
    assert_eq!(updated.email, "john@x.com");
}

#[test]
fn update_to_another_customers_email_conflicts_and_leaves_record_untouched() {
    let mut service = service();
    service.create_customer(&request("John", "john@x.com")).unwrap();
    let jane = service.create_customer(&request("Jane", "jane@x.com")).unwrap();
    let jane_id = jane.id.unwrap();

    pause_for_clock();
    let err = service
        .update_customer(jane_id, &request("Jane Renamed", "john@x.com"))
        .unwrap_err();
    assert!(matches!(err, CustomerServiceError::Conflict { .. }));

    let reloaded = service.get_customer(jane_id).unwrap();
    assert_eq!(reloaded, jane);
}

#[test]
fn update_and_delete_of_unknown_id_report_not_found() {
    let mut service = service();
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.update_customer(missing, &request("X", "x@x.com")),
        Err(CustomerServiceError::NotFound { .. })
    ));
    assert!(matches!(
        service.delete_customer(missing),
        Err(CustomerServiceError::NotFound { .. })
    ));
    assert!(matches!(
        service.activate_customer(missing),
        Err(CustomerServiceError::NotFound { .. })
    ));
    assert_eq!(stored_count(&service), 0);
}

#[test]
fn created_at_is_stable_and_updated_at_never_decreases() {
    let mut service = service();
    let created = service.create_customer(&request("John", "john@x.com")).unwrap();
    let id = created.id.unwrap();

    let mut last_updated = created.updated_at;
    for round in 0..5 {
        let updated = service
            .update_customer(id, &request(&format!("John {round}"), "john@x.com"))
            .unwrap();
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= last_updated);
        last_updated = updated.updated_at;
    }
}

#[test]
fn update_does_not_change_status() {
    let mut service = service();
    let created = service.create_customer(&request("John", "john@x.com")).unwrap();
    let id = created.id.unwrap();

    service.deactivate_customer(id).unwrap();
    let updated = service
        .update_customer(id, &request("John", "john@x.com"))
        .unwrap();
    assert_eq!(updated.status, CustomerStatus::Inactive);
}

#[test]
fn status_transitions_and_filtered_lists() {
    let mut service = service();
    let mut acme = request("A", "a@acme.com");
    acme.company = Some("Acme".to_string());
    let first = service.create_customer(&acme).unwrap();

    let mut acme_second = request("B", "b@acme.com");
    acme_second.company = Some("Acme".to_string());
    let second = service.create_customer(&acme_second).unwrap();
    service.create_customer(&request("C", "c@x.com")).unwrap();

    pause_for_clock();
    let deactivated = service.deactivate_customer(second.id.unwrap()).unwrap();
    assert_eq!(deactivated.status, CustomerStatus::Inactive);
    assert!(deactivated.updated_at > second.updated_at);

    let inactive = service
        .list_customers_by_status(CustomerStatus::Inactive)
        .unwrap();
    assert_eq!(inactive, vec![deactivated.clone()]);
    assert_eq!(
        service
            .list_customers_by_status(CustomerStatus::Active)
            .unwrap()
            .len(),
        2
    );

    let by_company = service.list_customers_by_company("Acme").unwrap();
    assert_eq!(by_company, vec![first, deactivated]);

    let reactivated = service.activate_customer(second.id.unwrap()).unwrap();
    assert_eq!(reactivated.status, CustomerStatus::Active);
}

#[test]
fn deleted_email_can_be_reused_with_a_fresh_id() {
    let mut service = service();
    let first = service.create_customer(&request("John", "john@x.com")).unwrap();
    service.delete_customer(first.id.unwrap()).unwrap();

    let second = service.create_customer(&request("John", "john@x.com")).unwrap();
    assert_ne!(second.id, first.id);
}

#[test]
fn read_all_on_empty_store_is_empty() {
    let mut service = service();
    assert!(service.list_customers().unwrap().is_empty());
}

#[test]
fn failed_transaction_rolls_back_earlier_writes() {
    let mut store = SqliteCustomerStore::open_in_memory().unwrap();

    let result: Result<(), CustomerServiceError> = store.in_transaction(TxMode::Write, |repo| {
        let stored = repo.put(&draft_customer("First", "first@x.com"))?;
        assert!(stored.id.is_some());
        Err(CustomerServiceError::Conflict {
            email: "forced@x.com".to_string(),
        })
    });
    assert!(result.is_err());

    let repo = SqliteCustomerRepository::try_new(store.connection()).unwrap();
    assert!(repo.list_all().unwrap().is_empty());
}

#[test]
fn write_layer_rejects_duplicates_that_slip_past_the_early_check() {
    let mut store = SqliteCustomerStore::open_in_memory().unwrap();

    // No availability check here; only the unique index stands in the way.
    let result: Result<(), CustomerServiceError> = store.in_transaction(TxMode::Write, |repo| {
        repo.put(&draft_customer("First", "john@x.com"))?;
        repo.put(&draft_customer("Second", "john@x.com"))?;
        Ok(())
    });

    assert!(matches!(
        result,
        Err(CustomerServiceError::Conflict { ref email }) if email == "john@x.com"
    ));
    let repo = SqliteCustomerRepository::try_new(store.connection()).unwrap();
    assert!(repo.list_all().unwrap().is_empty());
}

#[test]
fn concurrent_creates_with_same_email_admit_exactly_one() {
    const WRITERS: usize = 8;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crm.sqlite3");
    drop(SqliteCustomerStore::open(&path).unwrap());

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|index| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut service = CustomerService::new(SqliteCustomerStore::open(&path).unwrap());
                barrier.wait();
                service.create_customer(&request(&format!("Writer {index}"), "race@x.com"))
            })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => created += 1,
            Err(CustomerServiceError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, WRITERS - 1);

    let store = SqliteCustomerStore::open(&path).unwrap();
    let repo = SqliteCustomerRepository::try_new(store.connection()).unwrap();
    assert_eq!(repo.list_all().unwrap().len(), 1);
}

#[test]
fn repo_errors_map_to_service_errors() {
    let id = Uuid::new_v4();
    assert!(matches!(
        CustomerServiceError::from(RepoError::DuplicateEmail("a@x.com".to_string())),
        CustomerServiceError::Conflict { .. }
    ));
    assert!(matches!(
        CustomerServiceError::from(RepoError::NotFound(id)),
        CustomerServiceError::NotFound { .. }
    ));
    assert!(matches!(
        CustomerServiceError::from(RepoError::NotPersisted),
        CustomerServiceError::Repo(_)
    ));
}

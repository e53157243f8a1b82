//! Customer repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the entity-store primitives used by lifecycle operations:
//!   point lookups, email existence, scans, insert-or-replace and delete.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Customer::validate()` before SQL mutations.
//! - The unique index on `customers.email` is the final arbiter of email
//!   uniqueness; violations surface as `RepoError::DuplicateEmail`.
//! - Scans return rows in insertion order (`rowid ASC`).
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::customer::{
    Address, Customer, CustomerId, CustomerStatus, CustomerValidationError,
};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const CUSTOMER_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    phone,
    company,
    has_address,
    address_street,
    address_city,
    address_state,
    address_zip_code,
    address_country,
    status,
    created_at,
    updated_at
FROM customers";

const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "name",
    "email",
    "phone",
    "company",
    "has_address",
    "address_street",
    "address_city",
    "address_state",
    "address_zip_code",
    "address_country",
    "status",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for customer persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Record failed model invariants before reaching SQL.
    Validation(CustomerValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// The unique email index rejected the write.
    DuplicateEmail(String),
    /// Target customer row does not exist.
    NotFound(CustomerId),
    /// Delete was requested for a record the store never assigned an id to.
    NotPersisted,
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted row cannot be converted into a valid `Customer`.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateEmail(email) => write!(f, "email already exists: {email}"),
            Self::NotFound(id) => write!(f, "customer not found: {id}"),
            Self::NotPersisted => write!(f, "customer has not been persisted yet"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "customer repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "customer repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "customer repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted customer data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CustomerValidationError> for RepoError {
    fn from(value: CustomerValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Entity-store contract for customers.
///
/// Every method is atomic for a single record. Atomicity across several calls
/// is provided by the caller's transaction (see `CustomerStore`).
pub trait CustomerRepository {
    /// Point lookup by id.
    fn get(&self, id: CustomerId) -> RepoResult<Option<Customer>>;
    /// Point lookup by exact email.
    fn get_by_email(&self, email: &str) -> RepoResult<Option<Customer>>;
    /// Returns whether any customer currently holds `email`.
    fn exists_by_email(&self, email: &str) -> RepoResult<bool>;
    /// Full scan in insertion order.
    fn list_all(&self) -> RepoResult<Vec<Customer>>;
    /// Customers with the given status, insertion order.
    fn list_by_status(&self, status: CustomerStatus) -> RepoResult<Vec<Customer>>;
    /// Customers whose company matches exactly, insertion order.
    fn list_by_company(&self, company: &str) -> RepoResult<Vec<Customer>>;
    /// Inserts when `customer.id` is `None` (assigning a fresh id), otherwise
    /// replaces every mutable column of the existing row. A `Some` id that is
    /// not stored fails with `NotFound`; ids are never re-inserted.
    /// Returns the stored record.
    fn put(&self, customer: &Customer) -> RepoResult<Customer>;
    /// Hard-deletes the record.
    fn delete(&self, customer: &Customer) -> RepoResult<()>;
}

/// SQLite-backed customer repository.
pub struct SqliteCustomerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCustomerRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_customer_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Skips readiness checks; callers must have validated `conn` already.
    pub(crate) fn new_unchecked(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_customers(&self, sql: &str, bind: &[&dyn ToSql]) -> RepoResult<Vec<Customer>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut customers = Vec::new();
        while let Some(row) = rows.next()? {
            customers.push(parse_customer_row(row)?);
        }
        Ok(customers)
    }

    fn query_one(&self, sql: &str, bind: &[&dyn ToSql]) -> RepoResult<Option<Customer>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_customer_row(row)?)),
            None => Ok(None),
        }
    }
    fn insert_row(&self, id: CustomerId, customer: &Customer) -> RepoResult<()> {
        let address = customer.address.as_ref();
        self.conn
            .execute(
                "INSERT INTO customers (
                    id,
                    name,
                    email,
                    phone,
                    company,
                    has_address,
                    address_street,
                    address_city,
                    address_state,
                    address_zip_code,
                    address_country,
                    status,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
                params![
                    id.to_string(),
                    customer.name.as_str(),
                    customer.email.as_str(),
                    customer.phone.as_deref(),
                    customer.company.as_deref(),
                    bool_to_int(address.is_some()),
                    address.and_then(|value| value.street.as_deref()),
                    address.and_then(|value| value.city.as_deref()),
                    address.and_then(|value| value.state.as_deref()),
                    address.and_then(|value| value.zip_code.as_deref()),
                    address.and_then(|value| value.country.as_deref()),
                    customer.status.as_str(),
                    customer.created_at,
                    customer.updated_at,
                ],
            )
            .map_err(|err| map_write_error(err, customer.email.as_str()))?;
        Ok(())
    }

    /// Replaces every mutable column of an existing row. `created_at` is
    /// written on insert only.
    fn update_row(&self, id: CustomerId, customer: &Customer) -> RepoResult<()> {
        let address = customer.address.as_ref();
        let changed = self
            .conn
            .execute(
                "UPDATE customers
                SET
                    name = ?2,
                    email = ?3,
                    phone = ?4,
                    company = ?5,
                    has_address = ?6,
                    address_street = ?7,
                    address_city = ?8,
                    address_state = ?9,
                    address_zip_code = ?10,
                    address_country = ?11,
                    status = ?12,
                    updated_at = ?13
                WHERE id = ?1;",
                params![
                    id.to_string(),
                    customer.name.as_str(),
                    customer.email.as_str(),
                    customer.phone.as_deref(),
                    customer.company.as_deref(),
                    bool_to_int(address.is_some()),
                    address.and_then(|value| value.street.as_deref()),
                    address.and_then(|value| value.city.as_deref()),
                    address.and_then(|value| value.state.as_deref()),
                    address.and_then(|value| value.zip_code.as_deref()),
                    address.and_then(|value| value.country.as_deref()),
                    customer.status.as_str(),
                    customer.updated_at,
                ],
            )
            .map_err(|err| map_write_error(err, customer.email.as_str()))?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

impl CustomerRepository for SqliteCustomerRepository<'_> {
    fn get(&self, id: CustomerId) -> RepoResult<Option<Customer>> {
        self.query_one(
            &format!("{CUSTOMER_SELECT_SQL} WHERE id = ?1;"),
            &[&id.to_string()],
        )
    }

    fn get_by_email(&self, email: &str) -> RepoResult<Option<Customer>> {
        self.query_one(
            &format!("{CUSTOMER_SELECT_SQL} WHERE email = ?1;"),
            &[&email],
        )
    }

    fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM customers WHERE email = ?1);",
            [email],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_all(&self) -> RepoResult<Vec<Customer>> {
        self.query_customers(&format!("{CUSTOMER_SELECT_SQL} ORDER BY rowid ASC;"), &[])
    }

    fn list_by_status(&self, status: CustomerStatus) -> RepoResult<Vec<Customer>> {
        self.query_customers(
            &format!("{CUSTOMER_SELECT_SQL} WHERE status = ?1 ORDER BY rowid ASC;"),
            &[&status.as_str()],
        )
    }

    fn list_by_company(&self, company: &str) -> RepoResult<Vec<Customer>> {
        self.query_customers(
            &format!("{CUSTOMER_SELECT_SQL} WHERE company = ?1 ORDER BY rowid ASC;"),
            &[&company],
        )
    }

    fn put(&self, customer: &Customer) -> RepoResult<Customer> {
        customer.validate()?;

        let id = match customer.id {
            Some(id) => {
                self.update_row(id, customer)?;
                id
            }
            None => {
                let id = Uuid::new_v4();
                self.insert_row(id, customer)?;
                id
            }
        };

        // Read back so callers observe the persisted created_at on replace.
        self.get(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("customer {id} missing after write")))
    }

    fn delete(&self, customer: &Customer) -> RepoResult<()> {
        let id = customer.id.ok_or(RepoError::NotPersisted)?;
        let changed = self
            .conn
            .execute("DELETE FROM customers WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn map_write_error(err: rusqlite::Error, email: &str) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            && message.contains("customers.email")
        {
            return RepoError::DuplicateEmail(email.to_string());
        }
    }
    RepoError::from(err)
}

fn parse_customer_row(row: &Row<'_>) -> RepoResult<Customer> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in customers.id"))
    })?;

    let status_text: String = row.get("status")?;
    let status = CustomerStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in customers.status"
        ))
    })?;

    let address = match row.get::<_, i64>("has_address")? {
        0 => None,
        1 => Some(Address {
            street: row.get("address_street")?,
            city: row.get("address_city")?,
            state: row.get("address_state")?,
            zip_code: row.get("address_zip_code")?,
            country: row.get("address_country")?,
        }),
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid has_address value `{other}` in customers.has_address"
            )));
        }
    };

    let customer = Customer {
        id: Some(id),
        name: row.get("name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        company: row.get("company")?,
        address,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    customer.validate()?;
    Ok(customer)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_customer_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "customers")? {
        return Err(RepoError::MissingRequiredTable("customers"));
    }

    for &column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "customers", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "customers",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

//! Command-line adapter over the customer lifecycle service.
//!
//! # Responsibility
//! - Parse arguments into service requests.
//! - Translate service outcomes into a JSON envelope and exit code.

mod response;

use clap::{Args, Parser, Subcommand, ValueEnum};
use crm_core::{
    init_logging, AddressPayload, CrmConfig, CustomerId, CustomerRequest, CustomerService,
    CustomerStatus, SqliteCustomerStore,
};
use log::{error, info};
use response::{Envelope, Signal};
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
    name = "crm",
    version,
    about = "Customer record manager",
    after_help = "Examples:\n  crm create --name \"John Doe\" --email john@x.com\n  crm list --status inactive\n  crm delete 6f1c..."
)]
struct Cli {
    #[arg(long, global = true, help = "TOML config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "SQLite database file, overrides config")]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Create a customer")]
    Create(CustomerArgs),
    #[command(about = "Show one customer")]
    Get { id: String },
    #[command(about = "List customers in insertion order")]
    List {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long, conflicts_with = "status")]
        company: Option<String>,
    },
    #[command(about = "Replace the editable fields of a customer")]
    Update {
        id: String,
        #[command(flatten)]
        fields: CustomerArgs,
    },
    #[command(about = "Delete a customer")]
    Delete { id: String },
    #[command(about = "Mark a customer active")]
    Activate { id: String },
    #[command(about = "Mark a customer inactive")]
    Deactivate { id: String },
}

#[derive(Debug, Args)]
struct CustomerArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    street: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    zip_code: Option<String>,
    #[arg(long)]
    country: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    Active,
    Inactive,
}

impl From<StatusArg> for CustomerStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Active => CustomerStatus::Active,
            StatusArg::Inactive => CustomerStatus::Inactive,
        }
    }
}

impl From<CustomerArgs> for CustomerRequest {
    fn from(args: CustomerArgs) -> Self {
        let has_address = args.street.is_some()
            || args.city.is_some()
            || args.state.is_some()
            || args.zip_code.is_some()
            || args.country.is_some();
        let address = has_address.then(|| AddressPayload {
            street: args.street,
            city: args.city,
            state: args.state,
            zip_code: args.zip_code,
            country: args.country,
        });

        CustomerRequest {
            name: args.name,
            email: args.email,
            phone: args.phone,
            company: args.company,
            address,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let envelope = run(cli);
    println!("{}", envelope.render());
    ExitCode::from(envelope.status.exit_code())
}

fn run(cli: Cli) -> Envelope {
    let mut config = match CrmConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return Envelope::failure(Signal::InternalError, err.to_string()),
    };
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            return Envelope::failure(Signal::InternalError, err.to_string());
        }
    }

    let store = match SqliteCustomerStore::open(&config.database_path) {
        Ok(store) => store,
        Err(err) => {
            error!("event=cli_store_open module=cli status=error error={err}");
            return Envelope::failure(Signal::InternalError, err.to_string());
        }
    };
    info!("event=cli_store_open module=cli status=ok");

    dispatch(&mut CustomerService::new(store), cli.command)
}

fn dispatch(service: &mut CustomerService<SqliteCustomerStore>, command: Command) -> Envelope {
    let outcome = match command {
        Command::Create(args) => service
            .create_customer(&args.into())
            .map(|customer| Envelope::success(Signal::Created, &customer)),
        Command::Get { id } => with_id(&id, |id| service.get_customer(id))
            .map(|customer| Envelope::success(Signal::Ok, &customer)),
        Command::List { status, company } => match (status, company) {
            (Some(status), _) => service.list_customers_by_status(status.into()),
            (None, Some(company)) => service.list_customers_by_company(&company),
            (None, None) => service.list_customers(),
        }
        .map(|customers| Envelope::success(Signal::Ok, &customers)),
        Command::Update { id, fields } => {
            let request = CustomerRequest::from(fields);
            with_id(&id, |id| service.update_customer(id, &request))
                .map(|customer| Envelope::success(Signal::Ok, &customer))
        }
        Command::Delete { id } => with_id(&id, |id| service.delete_customer(id))
            .map(|()| Envelope::empty(Signal::NoContent)),
        Command::Activate { id } => with_id(&id, |id| service.activate_customer(id))
            .map(|customer| Envelope::success(Signal::Ok, &customer)),
        Command::Deactivate { id } => with_id(&id, |id| service.deactivate_customer(id))
            .map(|customer| Envelope::success(Signal::Ok, &customer)),
    };

    outcome.unwrap_or_else(|err| Envelope::from_service_error(&err))
}

/// Parses `raw` as a customer id. A malformed id cannot name a stored
/// customer, so it is reported as not found.
fn with_id<T>(
    raw: &str,
    op: impl FnOnce(CustomerId) -> crm_core::ServiceResult<T>,
) -> crm_core::ServiceResult<T> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => op(id),
        Err(_) => Err(crm_core::CustomerServiceError::customer_not_found(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, CustomerArgs};
    use clap::{CommandFactory, Parser};
    use crm_core::CustomerRequest;

    fn args(extra: &[&str]) -> CustomerArgs {
        let mut argv = vec!["crm", "create", "--name", "John", "--email", "john@x.com"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Create(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn address_is_absent_without_address_flags() {
        let request = CustomerRequest::from(args(&["--company", "Acme"]));
        assert_eq!(request.company.as_deref(), Some("Acme"));
        assert_eq!(request.address, None);
    }

    #[test]
    fn any_address_flag_builds_an_address() {
        let request = CustomerRequest::from(args(&["--city", "New York", "--zip-code", "10001"]));
        let address = request.address.expect("address should be present");
        assert_eq!(address.city.as_deref(), Some("New York"));
        assert_eq!(address.zip_code.as_deref(), Some("10001"));
        assert_eq!(address.street, None);
    }

    #[test]
    fn list_rejects_status_and_company_together() {
        let result =
            Cli::try_parse_from(["crm", "list", "--status", "active", "--company", "Acme"]);
        assert!(result.is_err());
    }

    #[test]
    fn malformed_id_is_not_found() {
        let result = super::with_id("not-a-uuid", |_| Ok(()));
        assert!(matches!(
            result,
            Err(crm_core::CustomerServiceError::NotFound {
                entity: "Customer",
                field: "id",
                ref value,
            }) if value == "not-a-uuid"
        ));
    }
}

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use npi_outreach::constants::{BACKEND_URL_ENV, DEFAULT_ROWS_PER_PAGE, DEFAULT_SESSION_ROWS_PER_PAGE};

const DEFAULT_STATE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data");

#[derive(Parser, Debug)]
#[command(name = "npi_outreach")]
#[command(about = "Query the NPI registry, export CSVs and run SMS outreach through the backend", long_about = None)]
pub struct Args {
    /// Backend origin, e.g. https://api.example.org.
    #[arg(long, env = BACKEND_URL_ENV)]
    pub backend_url: String,

    /// Directory holding the signed-in session and the recipient hand-off.
    #[arg(long, default_value = DEFAULT_STATE_DIR, global = true)]
    pub state_dir: PathBuf,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show one page of registry records.
    Records(RecordsArgs),
    /// Download the backend CSV export as npi-data.csv.
    Export(ExportArgs),
    /// Add phone numbers to the pending recipient list.
    Collect(CollectArgs),
    /// Send a message to the pending recipient list.
    Send(SendArgs),
    /// List and control messaging sessions.
    #[command(subcommand)]
    Sessions(SessionsCommand),
    /// Sign in, sign up and password management.
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Review Google sign-ins waiting for approval.
    #[command(subcommand)]
    GoogleUsers(GoogleUsersCommand),
}

/// Filters shared by every registry command. Dates default to the current
/// Monday-Sunday week.
#[derive(clap::Args, Debug, Clone)]
pub struct FilterArgs {
    /// Case-insensitive name match, or NPI substring.
    #[arg(long, default_value = "")]
    pub search: String,

    #[arg(long, default_value = "")]
    pub state: String,

    #[arg(long, default_value = "")]
    pub city: String,

    #[arg(long = "org", default_value = "")]
    pub organization: String,

    /// First day (YYYY-MM-DD).
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD).
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PageArgs {
    /// 1-based page to show.
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// One of 10, 25, 50, 100.
    #[arg(long, default_value_t = DEFAULT_ROWS_PER_PAGE)]
    pub rows_per_page: usize,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RecordsArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub paging: PageArgs,

    /// Also write the shown rows to this CSV file.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// List the state, city and organization values present on the page.
    #[arg(long)]
    pub options: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ExportArgs {
    /// First day (YYYY-MM-DD).
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD).
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Directory receiving npi-data.csv.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CollectArgs {
    /// Free-text numbers separated by commas, semicolons or newlines.
    #[arg(long)]
    pub numbers: Vec<String>,

    /// Add every row of the requested page.
    #[arg(long)]
    pub page_rows: bool,

    /// Add every not-yet-messaged row matching the filters.
    #[arg(long, conflicts_with_all = ["page_rows", "rows", "npis"])]
    pub all_filtered: bool,

    /// Add rows of the requested page by 1-based position.
    #[arg(long = "row", value_parser = clap::value_parser!(u64).range(1..))]
    pub rows: Vec<u64>,

    /// Add rows of the requested page by NPI.
    #[arg(long = "npi")]
    pub npis: Vec<String>,

    /// Remove these numbers from the list.
    #[arg(long)]
    pub remove: Vec<String>,

    /// Empty the list before adding.
    #[arg(long)]
    pub clear: bool,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub paging: PageArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SendArgs {
    /// Message body.
    #[arg(long, short)]
    pub message: String,

    /// Extra numbers for this send only.
    #[arg(long)]
    pub to: Vec<String>,

    /// One request per number with a pause in between.
    #[arg(long)]
    pub paced: bool,

    /// Pause between paced sends.
    #[arg(long, requires = "paced")]
    pub delay_secs: Option<u64>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct BusinessArgs {
    #[arg(long)]
    pub business_name: String,
    #[arg(long)]
    pub category: String,
    /// Day the business started (YYYY-MM-DD).
    #[arg(long)]
    pub start_date: NaiveDate,
    #[arg(long, default_value = "USD")]
    pub currency: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub country: String,
    #[arg(long)]
    pub state: String,
    #[arg(long)]
    pub city: String,
    #[arg(long)]
    pub postal_code: String,
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub confirm: String,
    #[arg(long)]
    pub accept_terms: bool,

    /// Logo image URL.
    #[arg(long)]
    pub logo: Option<String>,
    #[arg(long)]
    pub website: Option<String>,
    #[arg(long)]
    pub company_details: Option<String>,
    #[arg(long)]
    pub facebook: Option<String>,
    #[arg(long)]
    pub instagram: Option<String>,
    #[arg(long)]
    pub linkedin: Option<String>,
    #[arg(long)]
    pub youtube: Option<String>,
    #[arg(long)]
    pub twitter: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SessionsCommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// One of 5, 10, 25.
        #[arg(long, default_value_t = DEFAULT_SESSION_ROWS_PER_PAGE)]
        rows_per_page: usize,
    },
    Stop {
        id: u64,
    },
    Resume {
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// First sign-up step: emails an OTP.
    SendOtp {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        accept_terms: bool,
    },
    /// Second sign-up step.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        otp: String,
    },
    /// Create a business (vendor) account and sign in.
    RegisterBusiness(BusinessArgs),
    ForgotLink {
        #[arg(long)]
        email: String,
    },
    /// Set a new password with the token from a reset link.
    ForgotPassword {
        #[arg(long)]
        reset_token: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    /// Change the signed-in user's password.
    #[command(subcommand)]
    Reset(ResetCommand),
    SignOut,
    Whoami,
}

#[derive(Subcommand, Debug)]
pub enum ResetCommand {
    SendOtp,
    Verify {
        #[arg(long)]
        otp: String,
    },
    Set {
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum GoogleUsersCommand {
    List,
    Approve { id: u64 },
}

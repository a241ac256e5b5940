pub const BACKEND_URL_ENV: &str = "NEXT_PUBLIC_BACKEND_URL";
pub const USER_AGENT: &str = "npi-outreach/0.1";

pub const NPI_DATA_PATH: &str = "/get-npi-data";
pub const NPI_FILTER_DATA_PATH: &str = "/get-npi-data/filter-data";
pub const NPI_EXPORT_CSV_PATH: &str = "/get-npi-data/export-csv";
pub const EXPORT_FILE_NAME: &str = "npi-data.csv";

pub const SEND_SMS_PATH: &str = "/ringcentral/send-sms";
pub const LIST_SESSIONS_PATH: &str = "/ringcentral/get-all-sessions";
pub const STOP_SMS_PATH: &str = "/ringcentral/stop-sms";
pub const RESUME_SMS_PATH: &str = "/ringcentral/resume-sms";

pub const LOGIN_PATH: &str = "/auth/login";
pub const SEND_SIGNUP_OTP_PATH: &str = "/auth/users/send-otp";
pub const ADMIN_REGISTER_PATH: &str = "/auth/users/admin-register";
pub const VENDOR_REGISTER_PATH: &str = "/auth/users/vendor-register";
pub const SEND_FORGOT_PASSWORD_LINK_PATH: &str = "/auth/users/send-forgot-password-link";
pub const FORGOT_PASSWORD_PATH: &str = "/auth/users/forgot-password";
pub const SEND_PASSWORD_OTP_PATH: &str = "/auth/users/send-password-otp";
pub const VERIFY_PASSWORD_OTP_PATH: &str = "/auth/users/verify-password-otp";
pub const RESET_PASSWORD_PATH: &str = "/auth/users/reset-password";

pub const GOOGLE_USERS_PATH: &str = "/super-admin/get-google-users";
pub const APPROVE_USER_PATH: &str = "/super-admin/approve";

/// Area codes treated as landlines. A guess, not a carrier lookup.
pub const LANDLINE_AREA_CODES: [&str; 7] = ["212", "213", "305", "408", "512", "617", "703"];

pub const DEFAULT_ROWS_PER_PAGE: usize = 25;
pub const ROWS_PER_PAGE_OPTIONS: [usize; 4] = [10, 25, 50, 100];
pub const DEFAULT_SESSION_ROWS_PER_PAGE: usize = 10;
pub const SESSION_ROWS_PER_PAGE_OPTIONS: [usize; 3] = [5, 10, 25];

pub const PACED_SEND_DELAY_SECS: u64 = 5;
pub const FAILED_SAMPLE_LIMIT: usize = 5;

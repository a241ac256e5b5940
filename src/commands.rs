use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};

use npi_outreach::{
    auth::{self, BusinessDetails, BusinessSignUpRequest, SignInRequest, SignUpRequest},
    constants::SESSION_ROWS_PER_PAGE_OPTIONS,
    error::ValidationError,
    filter::{FilterCriteria, filter_options},
    google_users::{approve_user, list_google_users, mark_approved},
    handoff::HandoffStore,
    http::ApiClient,
    messaging::{DispatchMode, OutboundBatch, SendOutcome, dispatch},
    recipients::{CollectReport, RowSelector},
    registry::{RegistryRecord, export_csv, save_export, write_records_csv},
    report::{describe_collect, render_google_users, render_records, render_sessions},
    reset::{self, NewPassword, Otp, ResetOutcome, ResetStep},
    session::{SessionContext, SessionStore},
    sessions::{SessionAction, apply_action, list_sessions},
    view::RegistryView,
};

use crate::args::{
    AuthCommand, BusinessArgs, CollectArgs, ExportArgs, FilterArgs, GoogleUsersCommand, PageArgs, RecordsArgs,
    ResetCommand, SendArgs, SessionsCommand,
};

/// Everything a command needs, loaded once at startup.
pub struct App {
    pub client: ApiClient,
    pub session: SessionContext,
    pub session_store: SessionStore,
    pub handoff: HandoffStore,
}

impl App {
    fn save_session(&self) -> Result<()> {
        self.session_store
            .save(&self.session)
            .context("Failed saving session")
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Empty criteria over the given days, or over the week containing `today`
/// when neither bound is set. The range is validated.
fn date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<FilterCriteria, ValidationError> {
    let mut criteria = FilterCriteria::for_week_of(today);
    if start.is_some() || end.is_some() {
        criteria.start_date = start;
        criteria.end_date = end;
    }
    criteria.validate()?;
    Ok(criteria)
}

/// Builds validated criteria. Without explicit dates the current week is used.
fn criteria(filter: &FilterArgs, today: NaiveDate) -> Result<FilterCriteria, ValidationError> {
    let mut criteria = date_range(filter.start_date, filter.end_date, today)?;
    criteria.search_term = filter.search.trim().to_string();
    criteria.state = filter.state.trim().to_string();
    criteria.city = filter.city.trim().to_string();
    criteria.organization = filter.organization.trim().to_string();
    Ok(criteria)
}

async fn load_view(app: &App, filter: &FilterArgs, paging: &PageArgs) -> Result<RegistryView> {
    let mut view = RegistryView::new(criteria(filter, today())?);
    view.set_rows_per_page(paging.rows_per_page)?;
    view.set_page(paging.page.saturating_sub(1));
    view.load(&app.client)
        .await
        .context("Failed to fetch registry data")?;
    Ok(view)
}

pub async fn records(app: &App, args: RecordsArgs) -> Result<()> {
    let view = load_view(app, &args.filter, &args.paging).await?;
    let visible = view.visible_rows();
    println!(
        "{}",
        render_records(&visible, view.page(), view.rows_per_page(), view.total())
    );

    if args.options {
        let options = filter_options(view.rows());
        println!("States: {}", options.states.join(", "));
        println!("Cities: {}", options.cities.join(", "));
        println!("Organizations: {}", options.organizations.join(", "));
    }

    if let Some(path) = args.csv {
        let rows: Vec<RegistryRecord> = visible.into_iter().cloned().collect();
        write_records_csv(&rows, &path)?;
        tracing::info!("Wrote {} rows to {}", rows.len(), path.display());
    }
    Ok(())
}

pub async fn export(app: &App, args: ExportArgs) -> Result<()> {
    let range = date_range(args.start_date, args.end_date, today())?;
    let bytes = export_csv(&app.client, range.start_date, range.end_date)
        .await
        .context("Failed to export data")?;
    let path = save_export(&bytes, &args.output_dir)?;
    println!("CSV exported to {}", path.display());
    Ok(())
}

pub async fn collect(app: &App, args: CollectArgs) -> Result<()> {
    let mut recipients = app.handoff.load_recipients()?;
    if args.clear {
        recipients.clear();
    }
    for number in &args.remove {
        if !recipients.remove(number) {
            tracing::warn!("{number} was not in the recipient list");
        }
    }

    let mut report = CollectReport::default();
    for text in &args.numbers {
        report = report.merged(recipients.add_manual(text));
    }

    let wants_page = args.page_rows || !args.rows.is_empty() || !args.npis.is_empty();
    if args.all_filtered {
        let criteria = criteria(&args.filter, today())?;
        let added = recipients
            .collect_all_filtered(&app.client, &criteria)
            .await
            .context("Failed to fetch filtered records")?;
        report = report.merged(added);
    } else if wants_page {
        let view = load_view(app, &args.filter, &args.paging).await?;
        let visible = view.visible_rows();
        if args.page_rows {
            report = report.merged(recipients.add_rows(visible.iter().copied()));
        }
        let selection: Vec<RowSelector> = args
            .rows
            .iter()
            .map(|&n| RowSelector::Index(n as usize - 1))
            .chain(args.npis.iter().cloned().map(RowSelector::Npi))
            .collect();
        report = report.merged(recipients.select_rows(&visible, &selection));
    }

    app.handoff.save_recipients(&recipients)?;
    println!("{}", describe_collect(&report, recipients.len()));
    Ok(())
}

pub async fn send(app: &App, args: SendArgs) -> Result<()> {
    let mut recipients = app.handoff.load_recipients()?;
    for number in &args.to {
        recipients.add_manual(number);
    }
    let batch = OutboundBatch::compose(&recipients, &args.message)?;

    let mode = match (args.paced, args.delay_secs) {
        (false, _) => DispatchMode::Batch,
        (true, None) => DispatchMode::paced_default(),
        (true, Some(secs)) => DispatchMode::Paced {
            delay: Duration::from_secs(secs),
        },
    };

    match dispatch(&app.client, &batch, mode).await {
        Ok(SendOutcome::Accepted { message }) => {
            app.handoff.clear_recipients()?;
            println!(
                "{message}: {} number(s) accepted for delivery. Run `sessions list` to follow progress.",
                batch.numbers().len()
            );
            Ok(())
        }
        Ok(SendOutcome::Delivered(summary)) => {
            app.handoff.clear_recipients()?;
            println!("{summary}");
            Ok(())
        }
        Err(err) => {
            tracing::error!("Send failed; the recipient list was kept: {}", err.user_message());
            Err(err).context("Failed to send messages")
        }
    }
}

pub async fn sessions(app: &App, cmd: SessionsCommand) -> Result<()> {
    match cmd {
        SessionsCommand::List {
            page,
            rows_per_page,
        } => {
            if !SESSION_ROWS_PER_PAGE_OPTIONS.contains(&rows_per_page) {
                return Err(ValidationError::PageSize(rows_per_page).into());
            }
            let sessions = list_sessions(&app.client)
                .await
                .context("Failed to fetch sessions")?;
            println!(
                "{}",
                render_sessions(&sessions, page.saturating_sub(1), rows_per_page)
            );
        }
        SessionsCommand::Stop { id } => control(app, id, SessionAction::Stop).await?,
        SessionsCommand::Resume { id } => control(app, id, SessionAction::Resume).await?,
    }
    Ok(())
}

async fn control(app: &App, id: u64, action: SessionAction) -> Result<()> {
    let sessions = list_sessions(&app.client)
        .await
        .context("Failed to fetch sessions")?;
    let Some(session) = sessions.iter().find(|s| s.id == id) else {
        bail!("Session {id} not found");
    };
    if !session.status.allows(action) {
        bail!("Session {id} is {}; {action} is not available", session.status);
    }

    apply_action(&app.client, id, action)
        .await
        .with_context(|| format!("Failed to {action} session {id}"))?;
    println!("Session {id}: {action} requested");

    let sessions = list_sessions(&app.client)
        .await
        .context("Failed to refresh sessions")?;
    println!("{}", render_sessions(&sessions, 0, sessions.len().max(1)));
    Ok(())
}

pub async fn auth(app: &mut App, cmd: AuthCommand) -> Result<()> {
    match cmd {
        AuthCommand::SignIn { email, password } => {
            let request = SignInRequest::new(&email, &password)?;
            let user = auth::sign_in(&mut app.client, &mut app.session, &request)
                .await
                .context("Login failed")?;
            app.save_session()?;
            println!(
                "Signed in as {}",
                user.name.or(user.email).unwrap_or_else(|| "unknown user".to_string())
            );
        }
        AuthCommand::SendOtp {
            username,
            email,
            password,
            phone,
            accept_terms,
        } => {
            let request = SignUpRequest::new(&username, &email, &password, &phone, accept_terms)?;
            auth::send_signup_otp(&app.client, &request)
                .await
                .context("Sign up failed")?;
            println!("OTP sent to {}", request.email());
        }
        AuthCommand::Register { email, otp } => {
            let otp = Otp::for_signup(&otp)?;
            auth::register(&mut app.client, &mut app.session, &email, &otp)
                .await
                .context("Sign up failed")?;
            app.save_session()?;
            println!("Account created and signed in");
        }
        AuthCommand::RegisterBusiness(business) => {
            let request = business_sign_up(business)?;
            auth::register_business(&mut app.client, &mut app.session, &request)
                .await
                .context("Sign up business failed")?;
            app.save_session()?;
            println!("Business account created for {}", request.email());
        }
        AuthCommand::ForgotLink { email } => {
            auth::send_forgot_password_link(&app.client, &email)
                .await
                .context("Failed to send reset link")?;
            println!("Reset link sent to {}", email.trim());
        }
        AuthCommand::ForgotPassword {
            reset_token,
            password,
            confirm,
        } => {
            let password = NewPassword::parse(&password, &confirm)?;
            auth::forgot_password(&app.client, &password, &reset_token)
                .await
                .context("Failed to reset password")?;
            println!("Password updated; sign in with the new password");
        }
        AuthCommand::Reset(step) => reset_password(app, step).await?,
        AuthCommand::SignOut => {
            auth::sign_out(&mut app.client, &mut app.session);
            app.save_session()?;
            println!("Signed out");
        }
        AuthCommand::Whoami => match app.session.user().filter(|_| app.session.is_signed_in()) {
            Some(user) => {
                let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
                println!("Name:  {}", field(&user.name));
                println!("Email: {}", field(&user.email));
                println!("Role:  {}", field(&user.role));
            }
            None => println!("Not signed in"),
        },
    }
    Ok(())
}

fn business_sign_up(args: BusinessArgs) -> Result<BusinessSignUpRequest, ValidationError> {
    let optional = |v: Option<String>| v.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let details = BusinessDetails {
        business_name: args.business_name,
        category_name: args.category,
        start_date: Some(args.start_date),
        currency: args.currency,
        logo: optional(args.logo),
        website: optional(args.website),
        phone_number: args.phone,
        country: args.country,
        state: args.state,
        city: args.city,
        postal_code: args.postal_code,
        company_details: optional(args.company_details),
        username: args.username,
        email: args.email,
        facebook_link: optional(args.facebook),
        instagram_link: optional(args.instagram),
        linkedin_link: optional(args.linkedin),
        youtube_link: optional(args.youtube),
        twitter_link: optional(args.twitter),
    };
    BusinessSignUpRequest::new(details, &args.password, &args.confirm, args.accept_terms)
}

async fn reset_password(app: &mut App, cmd: ResetCommand) -> Result<()> {
    let step = match cmd {
        ResetCommand::SendOtp => ResetStep::send_otp(&app.session)?,
        ResetCommand::Verify { otp } => ResetStep::verify_otp(&app.session, &otp)?,
        ResetCommand::Set { password, confirm } => {
            ResetStep::set_password(&app.session, &password, &confirm)?
        }
    };
    let outcome = reset::submit(&mut app.client, &mut app.session, step)
        .await
        .context("Password reset failed")?;
    app.save_session()?;
    match outcome {
        ResetOutcome::OtpSent => println!("OTP sent to your email"),
        ResetOutcome::OtpVerified => println!("OTP verified; choose a new password"),
        ResetOutcome::PasswordUpdated => println!("Password updated; please sign in again"),
    }
    Ok(())
}

pub async fn google_users(app: &App, cmd: GoogleUsersCommand) -> Result<()> {
    let mut users = list_google_users(&app.client)
        .await
        .context("Failed to fetch users")?;
    if let GoogleUsersCommand::Approve { id } = cmd {
        approve_user(&app.client, id)
            .await
            .with_context(|| format!("Failed to approve user {id}"))?;
        if !mark_approved(&mut users, id) {
            tracing::warn!("User {id} approved but not present in the listing");
        }
        println!("User {id} approved");
    }
    println!("{}", render_google_users(&users));
    Ok(())
}

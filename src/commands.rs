// Command orchestration: turns parsed arguments into client calls and
// renders the results. Library errors bubble up as `anyhow::Error` and are
// mapped to exit codes in `exit_status_for`.

use crate::api::download::unpack;
use crate::api::{
    Action, ActionOutcome, ApiClient, CommentStatus, HttpTransport, Session, SessionStore,
    TarballSource, Transport, UploadOutcome, UploadRequest,
};
use crate::cli::{AuthArgs, Cli, Command, SubmitTarget};
use crate::config::{load_ignore_list, save_ignore_list, Config, FileSessionStore};
use crate::error::AurError;
use crate::package::{category_index, Package, SortField, DEFAULT_CATEGORY};
use crate::ui::{self, Palette, TerminalPrompt};
use anyhow::{bail, Context, Result};
use crossterm::style::Color;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success = 0,
    OptionError = 1,
    BadResponse = 2,
    BadAuth = 3,
    Failure = 250,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}

/// Exit status for an error that reached `main`.
pub fn exit_status_for(err: &anyhow::Error) -> ExitStatus {
    match err.chain().find_map(|e| e.downcast_ref::<AurError>()) {
        Some(AurError::BadResponse(_)) => ExitStatus::BadResponse,
        Some(AurError::Authentication(_)) => ExitStatus::BadAuth,
        Some(AurError::UnknownAction(_)) | Some(AurError::UnknownCategory(_)) => {
            ExitStatus::OptionError
        }
        _ => ExitStatus::Failure,
    }
}

/// Output settings shared by every command.
struct Output {
    palette: Palette,
    quiet: bool,
    json: bool,
    width: usize,
}

impl Output {
    fn msg(&self, text: &str) {
        print!("{}", self.palette.msg(text));
    }

    fn err(&self, text: &str) {
        eprint!("{}", self.palette.err(text));
    }

    fn separator(&self, count: usize) {
        if count > 1 && !self.json {
            println!("---");
        }
    }

    fn json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

pub fn run(cli: Cli, config: Config) -> Result<ExitStatus> {
    let out = Output {
        palette: Palette::new(!cli.no_color),
        quiet: cli.quiet,
        json: cli.json,
        width: ui::terminal_width(),
    };
    let mut api = ApiClient::from_config(&config).context("Failed to build HTTP client")?;

    match cli.command {
        Command::Derive { packages, save_to } => derive(&api, &out, &packages, save_to),
        Command::Upgrade { ignore, remember } => upgrade(&api, &out, &config, ignore, remember),
        Command::Search { terms, sort } => {
            for term in &terms {
                search(&api, &out, term, sort.field())?;
                out.separator(terms.len());
            }
            Ok(ExitStatus::Success)
        }
        Command::Msearch {
            maintainers,
            outofdate,
            sort,
        } => {
            for term in &maintainers {
                msearch(&api, &out, term, sort.field(), outofdate)?;
                out.separator(maintainers.len());
            }
            Ok(ExitStatus::Success)
        }
        Command::Info { packages } => {
            for name in &packages {
                info(&api, &out, name)?;
                out.separator(packages.len());
            }
            Ok(ExitStatus::Success)
        }
        Command::Submit {
            tarballs,
            category,
            vote,
            auth,
        } => {
            let session = prepare_session(&api, &auth, &config)?;
            api.set_session(session);
            submit(&api, &out, &tarballs, category.as_deref(), vote)
        }
        Command::Action {
            action,
            packages,
            id,
            auth,
        } => {
            let action: Action = action.parse()?;
            let session = prepare_session(&api, &auth, &config)?;
            api.set_session(session);
            let ids = resolve_ids(&api, &out, &packages, id)?;
            if ids.is_empty() {
                out.err("No ID retrieved for any of the given packages");
                return Ok(ExitStatus::Failure);
            }
            match api.apply(action, &ids)? {
                ActionOutcome::Message(message) => out.msg(&message),
                ActionOutcome::Unresolved => out.err(&format!("Unknown outcome of {action}")),
            }
            Ok(ExitStatus::Success)
        }
        Command::Comment {
            package,
            text,
            id,
            auth,
        } => {
            let text = if text == "-" { read_stdin()? } else { text };
            let session = prepare_session(&api, &auth, &config)?;
            api.set_session(session);
            let pkg_id = resolve_one(&api, &package, id)?;
            api.add_comment(pkg_id, &text)?;
            out.msg(&format!("Comment posted to {package}"));
            Ok(ExitStatus::Success)
        }
        Command::Uncomment {
            package,
            comment_id,
            id,
            auth,
        } => {
            let session = prepare_session(&api, &auth, &config)?;
            api.set_session(session);
            let pkg_id = resolve_one(&api, &package, id)?;
            api.delete_comment(pkg_id, comment_id)?;
            out.msg(&format!("Comment {comment_id} deleted from {package}"));
            Ok(ExitStatus::Success)
        }
        Command::Recategorize {
            package,
            category,
            id,
            auth,
        } => {
            let index = category_index(&category)?;
            let session = prepare_session(&api, &auth, &config)?;
            api.set_session(session);
            let pkg_id = resolve_one(&api, &package, id)?;
            api.change_category(pkg_id, &index)?;
            out.msg(&format!("{package} moved to {category}"));
            Ok(ExitStatus::Success)
        }
    }
}

/// Resolve the session for a write command and save it to the cookie jar
/// when asked to.
fn prepare_session(
    api: &ApiClient<HttpTransport>,
    auth: &AuthArgs,
    config: &Config,
) -> Result<Session> {
    let (user, pass) = auth.credentials();
    let store = FileSessionStore::new(config.session_file());
    let session = api.resolve_session(
        auth.cookie.as_deref(),
        user.as_deref(),
        pass.as_deref(),
        &store,
        &TerminalPrompt,
    )?;

    if let Some(jar) = &auth.cookie_jar {
        let jar = FileSessionStore::new(jar.clone().unwrap_or_else(|| config.session_file()));
        jar.save(session.cookie())
            .with_context(|| format!("Failed to save cookie to {}", jar.path().display()))?;
    }
    Ok(session)
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read comment from stdin")?;
    Ok(text)
}

fn resolve_one(api: &ApiClient<HttpTransport>, package: &str, by_id: bool) -> Result<u64> {
    if by_id {
        return package
            .parse()
            .with_context(|| format!("'{package}' is not a package id"));
    }
    match api.info(package)? {
        Some(pkg) => Ok(pkg.id),
        None => bail!("Failed to retrieve ID for {package}"),
    }
}

fn resolve_ids(
    api: &ApiClient<HttpTransport>,
    out: &Output,
    packages: &[String],
    by_id: bool,
) -> Result<Vec<u64>> {
    let mut ids = Vec::new();
    for package in packages {
        match resolve_one(api, package, by_id) {
            Ok(id) => ids.push(id),
            Err(e) => out.err(&format!("{e:#}")),
        }
    }
    Ok(ids)
}

fn derive(
    api: &ApiClient<HttpTransport>,
    out: &Output,
    packages: &[String],
    save_to: Option<PathBuf>,
) -> Result<ExitStatus> {
    let dir = match save_to {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Directory not writable: {}", dir.display()))?;
            dir
        }
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let mut status = ExitStatus::Success;
    for name in packages {
        match api.download(name)? {
            Some(bytes) => {
                unpack(name, &bytes, &dir)?;
                out.msg(&format!(
                    "AUR package {} saved in {}",
                    out.palette.paint(name, Color::White, true),
                    dir.display()
                ));
            }
            None => {
                out.err(&format!("Failed to download from AUR: {name}"));
                status = ExitStatus::Failure;
            }
        }
    }
    Ok(status)
}

fn search(
    api: &ApiClient<HttpTransport>,
    out: &Output,
    term: &str,
    sort: SortField,
) -> Result<()> {
    let packages = api.search(term, Some(sort))?;
    if out.json {
        return out.json(&packages);
    }
    if packages.is_empty() {
        out.msg("No package found.");
        return Ok(());
    }
    print_briefs(out, &packages);
    Ok(())
}

fn msearch(
    api: &ApiClient<HttpTransport>,
    out: &Output,
    term: &str,
    sort: SortField,
    outofdate_only: bool,
) -> Result<()> {
    let mut packages = api.maintainer_search(term, Some(sort))?;
    if outofdate_only {
        packages.retain(|p| p.out_of_date);
    }
    if out.json {
        return out.json(&packages);
    }
    if packages.is_empty() {
        if outofdate_only {
            println!("{term} is a good Maintainer. Nothing is outdated.");
        } else {
            out.msg(&format!("Nothing maintained by {term} is found."));
        }
        return Ok(());
    }
    if outofdate_only {
        for pkg in &packages {
            println!(
                "{} {}",
                pkg.name,
                out.palette.paint(&pkg.version, Color::DarkGrey, true)
            );
        }
    } else {
        print_briefs(out, &packages);
    }
    Ok(())
}

fn print_briefs(out: &Output, packages: &[Package]) {
    let listing: String = packages
        .iter()
        .map(|pkg| ui::package_brief(&out.palette, pkg, out.width))
        .collect();
    print!("{listing}");
}

fn info(api: &ApiClient<HttpTransport>, out: &Output, name: &str) -> Result<()> {
    let Some(pkg) = api.info(name)? else {
        out.msg("No such package.");
        return Ok(());
    };
    if out.json {
        return out.json(&pkg);
    }
    let rows = ui::info_rows(&pkg, api.package_page(pkg.id));
    print!("{}", ui::info_chart(&rows, out.width));
    Ok(())
}

/// A `submit` argument with its category and comment resolved.
#[derive(Debug, PartialEq, Eq)]
struct PlannedUpload {
    tarball: String,
    category: String,
    comment: Option<String>,
}

/// Resolve every target before anything is sent, so a bad argument cannot
/// stop a batch halfway. A `-` comment reads stdin once and is shared by
/// every target that asks for it.
fn plan_uploads(
    tarballs: &[String],
    default_category: &str,
    mut read_comment: impl FnMut() -> Result<String>,
) -> Result<Vec<PlannedUpload>> {
    let mut stdin_comment: Option<String> = None;
    let mut planned = Vec::with_capacity(tarballs.len());
    for arg in tarballs {
        let target = SubmitTarget::parse(arg);
        let category = match target.category.as_deref() {
            Some(name) => category_index(name)?,
            None => default_category.to_string(),
        };
        let comment = match target.comment {
            Some(c) if c == "-" => {
                if stdin_comment.is_none() {
                    stdin_comment = Some(read_comment()?);
                }
                stdin_comment.clone()
            }
            other => other,
        };
        planned.push(PlannedUpload {
            tarball: target.tarball,
            category,
            comment,
        });
    }
    Ok(planned)
}

fn submit(
    api: &ApiClient<HttpTransport>,
    out: &Output,
    tarballs: &[String],
    default_category: Option<&str>,
    vote: bool,
) -> Result<ExitStatus> {
    let default_category = match default_category {
        Some(name) => category_index(name)?,
        None => DEFAULT_CATEGORY.to_string(),
    };
    let planned = plan_uploads(tarballs, &default_category, read_stdin)?;

    let mut ids = Vec::new();
    let mut status = ExitStatus::Success;
    for upload in planned {
        let request = UploadRequest {
            tarball: TarballSource::path(&upload.tarball),
            category: upload.category,
            comment: upload.comment,
        };

        let spinner =
            (!out.quiet).then(|| ui::spinner(&format!("Uploading {}...", upload.tarball)));
        let outcome = api.upload(request);
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        match outcome {
            Ok(UploadOutcome::Uploaded { id, comment }) => {
                out.msg(&format!("Uploaded {} [{id}]", upload.tarball));
                if let CommentStatus::Failed(message) = comment {
                    out.err(&format!(
                        "Comment on {} was not posted: {message}",
                        upload.tarball
                    ));
                    status = ExitStatus::Failure;
                }
                ids.push(id);
            }
            Ok(UploadOutcome::Rejected { message }) => {
                out.err(&message);
                status = ExitStatus::Failure;
            }
            Ok(UploadOutcome::Unresolved) => {
                out.err("Unknown error while uploading");
                status = ExitStatus::Failure;
            }
            Err(e @ AurError::MissingFile { .. }) => {
                out.err(&e.to_string());
                status = ExitStatus::Failure;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if vote && !ids.is_empty() {
        match api.apply(Action::Vote, &ids)? {
            ActionOutcome::Message(message) => out.msg(&message),
            ActionOutcome::Unresolved => out.err("Unknown error while voting"),
        }
    }
    Ok(status)
}

/// Result of looking up installed foreign packages in the repository.
#[derive(Debug, Default)]
struct Lookup<'a> {
    found: Vec<(&'a str, &'a str, Package)>,
    /// Packages the repository does not know.
    not_found: Vec<String>,
    /// Lookups that failed; these say nothing about the package.
    failed: Vec<(String, AurError)>,
}

fn lookup_installed<'a, T: Transport>(
    api: &ApiClient<T>,
    installed: &[(&'a str, &'a str)],
) -> Lookup<'a> {
    let mut lookup = Lookup::default();
    for &(name, local) in installed {
        match api.info(name) {
            Ok(Some(pkg)) => lookup.found.push((name, local, pkg)),
            Ok(None) => lookup.not_found.push(name.to_string()),
            Err(e) => {
                warn!(package = name, error = %e, "info lookup failed");
                lookup.failed.push((name.to_string(), e));
            }
        }
    }
    lookup
}

fn upgrade(
    api: &ApiClient<HttpTransport>,
    out: &Output,
    config: &Config,
    ignore: Vec<String>,
    remember: bool,
) -> Result<ExitStatus> {
    let listing = std::process::Command::new("pacman")
        .arg("-Qm")
        .output()
        .context("Failed to run pacman -Qm")?;
    if !listing.status.success() {
        bail!("pacman -Qm failed");
    }
    let listing = String::from_utf8_lossy(&listing.stdout);

    let remembered = load_ignore_list(&config.ignore_file()).unwrap_or_default();
    let installed: Vec<(&str, &str)> = listing
        .lines()
        .filter_map(|line| line.split_once(' '))
        .filter(|(name, _)| {
            !remembered.iter().any(|i| i == name) && !ignore.iter().any(|i| i == name)
        })
        .collect();
    let max_len = installed.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    let Lookup {
        found,
        not_found,
        failed,
    } = lookup_installed(api, &installed);
    let mut status = ExitStatus::Success;
    for (name, e) in &failed {
        out.err(&format!("Could not check {name}: {e}"));
        status = ExitStatus::Failure;
    }

    let mut upgradable = Vec::new();
    for (name, local, pkg) in found {
        let pad = out.palette.paint(
            &".".repeat(max_len - name.len() + 1),
            Color::DarkGrey,
            false,
        );
        match vercmp(&pkg.version, local)?.as_str() {
            "1" => {
                upgradable.push(name.to_string());
                if !out.quiet {
                    println!(
                        "{}{pad}{}",
                        out.palette.paint(name, Color::White, true),
                        out.palette.paint(
                            &format!("{local} -> {}", pkg.version),
                            Color::Green,
                            true
                        )
                    );
                }
            }
            "-1" if !out.quiet => {
                println!(
                    "{}{pad}{}",
                    out.palette.paint(name, Color::White, true),
                    out.palette.paint(
                        &format!("{local} >> {}", pkg.version),
                        Color::Yellow,
                        true
                    )
                );
            }
            _ => {}
        }
    }

    out.msg("Upgradable AUR Packages:");
    println!("{}", upgradable.join(" "));

    if remember {
        config.ensure_data_dir()?;
        let mut names = not_found;
        names.extend(remembered);
        save_ignore_list(&config.ignore_file(), &names)
            .context("Failed to save the ignore list")?;
    }
    Ok(status)
}

/// `vercmp a b`: "1" when a is newer, "-1" when older, "0" when equal.
fn vercmp(a: &str, b: &str) -> Result<String> {
    let output = std::process::Command::new("vercmp")
        .args([a, b])
        .output()
        .context("Failed to run vercmp")?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

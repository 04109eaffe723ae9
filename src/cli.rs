// Command-line definition.

use crate::package::SortField;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const EXAMPLES: &str = "\
Examples:
  aurcli action vote -c -- x264-git
      Prompts for username and password unless a cookie was saved before;
      -c without a value saves this session's cookie in the data directory.

  aurcli action vote -c /tmp/cookie -u user:passwd x264-git

  aurcli submit ffcast.src.tar.gz@multimedia:'New release.' -b /tmp/cookie
      `@' picks the category and `:' adds a comment (`:-' reads it from stdin).
      -b takes a cookie file or a name=value pair such as AURSID=F6C22B006F.

  aurcli upgrade --ignore foo,bar --remember
      Skips foo and bar this time; --remember adds every package the AUR
      does not know to the saved ignore list, so it is skipped next time.";

#[derive(Parser, Debug)]
#[command(name = "aurcli", version, about = "Command-line client for the Arch User Repository")]
#[command(after_help = EXAMPLES)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Reduce output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download and unpack build scripts for packages
    #[command(visible_alias = "d")]
    Derive {
        packages: Vec<String>,

        /// Save the packages in this directory
        #[arg(short = 't', long = "save-to")]
        save_to: Option<PathBuf>,
    },

    /// Check installed foreign packages for newer AUR versions
    #[command(visible_alias = "u")]
    Upgrade {
        /// Packages not to check
        #[arg(long, value_delimiter = ',')]
        ignore: Vec<String>,

        /// Ignore packages not found in the AUR next time
        #[arg(long)]
        remember: bool,
    },

    /// Search package names and descriptions
    #[command(visible_alias = "s")]
    Search {
        #[arg(required = true)]
        terms: Vec<String>,

        #[command(flatten)]
        sort: SortArgs,
    },

    /// Show detailed information about packages
    #[command(visible_alias = "i")]
    Info {
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Search packages by maintainer
    #[command(visible_alias = "m")]
    Msearch {
        #[arg(required = true)]
        maintainers: Vec<String>,

        /// Only list out-of-date packages
        #[arg(short, long)]
        outofdate: bool,

        #[command(flatten)]
        sort: SortArgs,
    },

    /// Upload source tarballs (tarball[@category][:comment])
    #[command(visible_alias = "p")]
    Submit {
        #[arg(required = true)]
        tarballs: Vec<String>,

        /// Category for tarballs that do not name one
        #[arg(long)]
        category: Option<String>,

        /// Vote for the uploaded packages
        #[arg(short, long)]
        vote: bool,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Apply an action (vote, flag, notify, adopt, disown, delete, unvote, unflag, unnotify)
    #[command(visible_alias = "a")]
    Action {
        action: String,

        #[arg(required = true)]
        packages: Vec<String>,

        /// Packages are given by id instead of name
        #[arg(long)]
        id: bool,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Comment on a package (`-` reads the text from stdin)
    Comment {
        package: String,
        text: String,

        #[arg(long)]
        id: bool,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Delete a comment
    Uncomment {
        package: String,
        comment_id: u64,

        #[arg(long)]
        id: bool,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Move a package to another category
    Recategorize {
        package: String,
        category: String,

        #[arg(long)]
        id: bool,

        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SortArgs {
    /// Sort by votes
    #[arg(short, long, conflicts_with = "sort")]
    pub votes: bool,

    /// Sort by field (name, version, votes, id, category, maintainer, outofdate)
    #[arg(long)]
    pub sort: Option<SortField>,
}

impl SortArgs {
    pub fn field(&self) -> SortField {
        if self.votes {
            SortField::NumVotes
        } else {
            self.sort.unwrap_or(SortField::Name)
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct AuthArgs {
    /// Login as user[:passwd]; forces a fresh login
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,

    /// Cookie from an earlier session (name=data or a file)
    #[arg(short = 'b', long)]
    pub cookie: Option<String>,

    /// Save the session cookie to a file (default: data directory)
    #[arg(short = 'c', long = "cookie-jar")]
    pub cookie_jar: Option<Option<PathBuf>>,
}

impl AuthArgs {
    /// Split `user:passwd`; the password part is optional.
    pub fn credentials(&self) -> (Option<String>, Option<String>) {
        match self.user.as_deref() {
            None => (None, None),
            Some(login) => match login.split_once(':') {
                Some((user, pass)) => (Some(user.to_string()), Some(pass.to_string())),
                None => (Some(login.to_string()), None),
            },
        }
    }
}

/// One `submit` argument: `tarball[@category][:comment]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTarget {
    pub tarball: String,
    pub category: Option<String>,
    pub comment: Option<String>,
}

impl SubmitTarget {
    pub fn parse(arg: &str) -> Self {
        let (head, comment) = match arg.split_once(':') {
            Some((head, comment)) if !comment.is_empty() => (head, Some(comment.to_string())),
            Some((head, _)) => (head, None),
            None => (arg, None),
        };
        let (tarball, category) = match head.split_once('@') {
            Some((tarball, category)) if !category.is_empty() => {
                (tarball, Some(category.to_string()))
            }
            Some((tarball, _)) => (tarball, None),
            None => (head, None),
        };
        SubmitTarget {
            tarball: tarball.to_string(),
            category,
            comment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_submit_targets() {
        assert_eq!(
            SubmitTarget::parse("ffcast.src.tar.gz@multimedia:New release."),
            SubmitTarget {
                tarball: "ffcast.src.tar.gz".into(),
                category: Some("multimedia".into()),
                comment: Some("New release.".into()),
            }
        );
        assert_eq!(
            SubmitTarget::parse("foo.src.tar.gz:-"),
            SubmitTarget {
                tarball: "foo.src.tar.gz".into(),
                category: None,
                comment: Some("-".into()),
            }
        );
        assert_eq!(SubmitTarget::parse("foo.src.tar.gz").category, None);
    }

    #[test]
    fn splits_user_and_password() {
        let auth = AuthArgs {
            user: Some("joe:s3cret".into()),
            ..AuthArgs::default()
        };
        assert_eq!(
            auth.credentials(),
            (Some("joe".into()), Some("s3cret".into()))
        );
    }

    #[test]
    fn cookie_jar_value_is_optional() {
        let cli =
            Cli::try_parse_from(["aurcli", "action", "vote", "-c", "--", "x264-git"]).unwrap();
        match cli.command {
            Command::Action { auth, packages, .. } => {
                assert_eq!(auth.cookie_jar, Some(None));
                assert_eq!(packages, ["x264-git"]);
            }
            other => panic!("parsed {other:?}"),
        }
    }

    #[test]
    fn votes_flag_sorts_by_votes() {
        let cli = Cli::try_parse_from(["aurcli", "search", "-v", "ffcast"]).unwrap();
        match cli.command {
            Command::Search { sort, .. } => assert_eq!(sort.field(), SortField::NumVotes),
            other => panic!("parsed {other:?}"),
        }
    }
}

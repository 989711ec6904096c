//! Git-backed [`RevisionSource`]

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Repository, Sort};
use std::path::{Path, PathBuf};

use crate::revision::{Revision, RevisionSource};

/// A git repository with a working tree, walked from the root commit to HEAD
///
/// History is walked from the branch HEAD pointed to when the repository was
/// opened, so the detached checkouts made while scanning never shorten it.
pub struct GitRepository {
    repo: Repository,
    work_tree: PathBuf,
    branch: Option<String>,
}

impl GitRepository {
    /// Open a repository from its working tree or its `.git` directory
    pub fn open(repo_path: &Path) -> Result<Self> {
        let repo = Repository::open(repo_path)
            .with_context(|| format!("Could not open the repository {}", repo_path.display()))?;
        let work_tree = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("{} is a bare repository", repo_path.display()))?;

        let branch = match repo.head() {
            Ok(head) if head.is_branch() => head.name().map(str::to_string),
            Ok(_) => {
                tracing::warn!(
                    "HEAD of {} is detached; history ends at the detached commit",
                    repo_path.display()
                );
                None
            }
            // Unborn branch; listing revisions reports it.
            Err(_) => None,
        };

        Ok(Self {
            repo,
            work_tree,
            branch,
        })
    }

    /// Branch the history is walked from, `None` when HEAD was detached
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Clone a local repository into `dest` and open the copy
    ///
    /// Scanning a copy leaves the original working tree untouched.
    pub fn clone_local(source: &Path, dest: &Path) -> Result<Self> {
        let source = std::fs::canonicalize(source)
            .with_context(|| format!("Could not resolve {}", source.display()))?;
        let url = source
            .to_str()
            .ok_or_else(|| anyhow!("non UTF-8 repository path {}", source.display()))?;

        RepoBuilder::new()
            .clone(url, dest)
            .with_context(|| format!("Could not copy {} into {}", url, dest.display()))?;

        Self::open(dest)
    }
}

impl RevisionSource for GitRepository {
    fn revisions(&self) -> Result<Vec<Revision>> {
        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)?;
        match &self.branch {
            Some(branch) => walk
                .push_ref(branch)
                .with_context(|| format!("Could not resolve {}", branch))?,
            None => walk
                .push_head()
                .context("Could not resolve HEAD; does the repository have any commits?")?,
        }

        let mut revisions = Vec::new();
        for oid in walk {
            let oid = oid?;
            let commit = self.repo.find_commit(oid)?;
            revisions.push(Revision::new(
                oid.to_string(),
                commit_timestamp(&commit.time())?,
            ));
        }

        Ok(revisions)
    }

    fn checkout(&self, id: &str) -> Result<()> {
        let commit = self
            .repo
            .revparse_single(id)
            .and_then(|obj| obj.peel_to_commit())
            .with_context(|| format!("unknown revision {}", id))?;

        let mut opts = CheckoutBuilder::new();
        opts.force();
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut opts))
            .with_context(|| format!("checkout of {} failed", id))?;
        self.repo.set_head_detached(commit.id())?;

        Ok(())
    }

    fn work_tree(&self) -> &Path {
        &self.work_tree
    }
}

/// Convert a committer time into an offset date-time in the committer's zone
fn commit_timestamp(time: &git2::Time) -> Result<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60)
        .ok_or_else(|| anyhow!("invalid UTC offset {} minutes", time.offset_minutes()))?;
    let utc = DateTime::from_timestamp(time.seconds(), 0)
        .ok_or_else(|| anyhow!("commit time {} out of range", time.seconds()))?;
    Ok(utc.with_timezone(&offset))
}

//! Builds reply rows for parsed commands.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::parser::{parse, Command, ParsedCommand};
use super::reply::{Action, ReplyItem};
use crate::cache::PackageCache;
use crate::config::Settings;
use crate::matcher::Matcher;
use crate::store::{self, InstalledPackage, PackageStore};

/// Commands offered by the help reply, in display order.
const COMMANDS: [Command; 3] = [Command::Install, Command::Remove, Command::List];

/// Turns queries into reply rows using the cache, the store and the matcher.
pub struct CommandRouter {
    cache: PackageCache,
    store: Arc<dyn PackageStore>,
    matcher: Matcher,
    /// Query prefix the host routes to this plugin (e.g. `/hpm`).
    prefix: String,
    /// Fallback row description.
    plugin_name: String,
    timeout: Duration,
}

impl CommandRouter {
    /// Create a router.
    pub fn new(cache: PackageCache, store: Arc<dyn PackageStore>, settings: &Settings) -> Self {
        Self {
            cache,
            store,
            matcher: Matcher::new(),
            prefix: settings.prefix.clone(),
            plugin_name: settings.plugin_name.clone(),
            timeout: settings.operation_timeout(),
        }
    }

    /// Full query strings for each command, e.g. `/hpm install `.
    pub fn command_queries(&self) -> Vec<String> {
        COMMANDS
            .iter()
            .filter_map(|c| c.keyword())
            .map(|keyword| format!("{} {} ", self.prefix, keyword))
            .collect()
    }

    /// Parse `query` and build its reply.
    pub async fn reply_for(&self, query: &str) -> Vec<ReplyItem> {
        self.build_reply(&parse(query), query).await
    }

    /// Build the reply rows for a parsed command.
    ///
    /// `query` is the raw query, used by the help reply.
    pub async fn build_reply(&self, parsed: &ParsedCommand, query: &str) -> Vec<ReplyItem> {
        debug!(command = ?parsed.command, argument = ?parsed.argument, "Building reply");
        match parsed.command {
            Command::Install => self.install_rows(parsed.argument.as_deref()),
            Command::Remove => self
                .installed()
                .await
                .into_iter()
                .map(|p| self.remove_row(p))
                .collect(),
            Command::List => self
                .installed()
                .await
                .into_iter()
                .map(|p| self.list_row(p))
                .collect(),
            Command::Help => self.help_rows(query),
        }
    }

    fn install_rows(&self, argument: Option<&str>) -> Vec<ReplyItem> {
        let snapshot = self.cache.snapshot();
        let fragment = argument.map(str::trim).filter(|a| !a.is_empty());

        let Some(fragment) = fragment else {
            return snapshot
                .iter()
                .map(|p| {
                    self.install_row(
                        &p.name,
                        format!("install <b>{}</b> {}", p.name, p.version),
                        &p.description,
                    )
                })
                .collect();
        };

        self.matcher
            .fuzzy(&snapshot, fragment, |p| p.name.as_str())
            .into_iter()
            .map(|m| {
                let name = Matcher::bold_html(&m.elem.name, &m.indices);
                self.install_row(
                    &m.elem.name,
                    format!("install {} {}", name, m.elem.version),
                    &m.elem.description,
                )
            })
            .collect()
    }

    fn install_row(&self, name: &str, title: String, description: &str) -> ReplyItem {
        let desc = if description.is_empty() {
            self.plugin_name.as_str()
        } else {
            description
        };
        ReplyItem::new(name, title, desc).with_payload(Action::Install)
    }

    fn remove_row(&self, package: InstalledPackage) -> ReplyItem {
        let title = format!("remove <b>{}</b> {}", package.name, package.version);
        ReplyItem::new(package.name, title, &self.plugin_name).with_payload(Action::Remove)
    }

    fn list_row(&self, package: InstalledPackage) -> ReplyItem {
        let title = format!("<b>{}</b> {}", package.name, package.version);
        ReplyItem::new(package.name, title, &self.plugin_name)
    }

    fn help_rows(&self, query: &str) -> Vec<ReplyItem> {
        let commands = self.command_queries();
        let typed = format!("{} {}", self.prefix, query.trim_start());

        self.matcher
            .head(&commands, &typed, |c| c.as_str())
            .into_iter()
            .map(|m| {
                ReplyItem::new(
                    m.elem.as_str(),
                    Matcher::bold_html(m.elem, &m.indices),
                    &self.plugin_name,
                )
                .with_redirect(m.elem.as_str())
            })
            .collect()
    }

    /// Read the store fresh. Failures degrade to an empty list.
    async fn installed(&self) -> Vec<InstalledPackage> {
        match store::timed(self.timeout, "list packages", self.store.list()).await {
            Ok(packages) => packages,
            Err(e) => {
                warn!("Failed to list installed packages: {}", e);
                Vec::new()
            }
        }
    }
}

//! Provider subprocess backend.
//!
//! A provider is any executable named `lessondir-provider-<name>` on `PATH`
//! that speaks the JSON protocol in [`crate::remote::protocol`]. Providers
//! own their credentials; core only passes the session identity along.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{Interval, MissedTickBehavior, interval, timeout};
use tracing::{debug, trace};

use crate::error::{LessonDirError, LessonDirResult};
use crate::lesson::{self, Lesson, LessonChanges, LessonDraft, LessonId};
use crate::remote::backend::{RemoteBackend, SnapshotStream};
use crate::remote::protocol::{
    Command, CreateLesson, CreateTemplate, DeleteLesson, DeleteTemplate, LessonDocument,
    ListLessons, ListTemplates, LoadRates, LoadSettings, LoadStudents, ProviderCommand,
    RatesDocument, Request, Response, SaveRates, SaveSettings, SaveStudents, StudentsDocument,
    UpdateLesson,
};
use crate::session::SessionIdentity;
use crate::settings::{RateMap, Settings};
use crate::template::{NewTemplate, Template};

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Provider(String);

impl Provider {
    pub fn from_name(name: &str) -> Self {
        Provider(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    fn binary_path(&self) -> LessonDirResult<PathBuf> {
        let binary_name = format!("lessondir-provider-{}", self.0);
        which::which(&binary_name).map_err(|_| LessonDirError::ProviderNotInstalled(binary_name))
    }

    /// Call a typed provider command and return the result.
    pub async fn call<C: ProviderCommand>(&self, cmd: C) -> LessonDirResult<C::Response> {
        timeout(PROVIDER_TIMEOUT, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| LessonDirError::ProviderTimeout(PROVIDER_TIMEOUT.as_secs()))?
    }

    /// One request per process: spawn, write the request line, read the reply.
    async fn call_raw<P: Serialize, R: DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> LessonDirResult<R> {
        let line = request_line(command, params)?;
        let binary = self.binary_path()?;
        trace!(provider = %self.0, ?command, "Calling provider");

        let stdout = self.exchange(&binary, &line).await?;
        decode_reply(command, &stdout)
    }

    async fn exchange(&self, binary: &Path, line: &str) -> LessonDirResult<Vec<u8>> {
        let mut child = TokioCommand::new(binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                LessonDirError::Provider(format!("Cannot start {}: {e}", binary.display()))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(line.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        match output.status.code() {
            Some(0) => Ok(output.stdout),
            Some(code) => Err(LessonDirError::Provider(format!(
                "Provider '{}' exited with status {code}",
                self.0
            ))),
            None => Err(LessonDirError::Provider(format!(
                "Provider '{}' was killed by a signal",
                self.0
            ))),
        }
    }
}

fn request_line<P: Serialize>(command: Command, params: P) -> LessonDirResult<String> {
    let request = Request {
        command,
        params: serde_json::to_value(params)?,
    };
    let mut line = serde_json::to_string(&request)?;
    line.push('\n');
    Ok(line)
}

fn decode_reply<R: DeserializeOwned>(command: Command, stdout: &[u8]) -> LessonDirResult<R> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return Err(LessonDirError::Provider(format!("No reply to {command:?}")));
    }

    match serde_json::from_str(text) {
        Ok(Response::Success { data }) => Ok(data),
        Ok(Response::Error { error }) => Err(LessonDirError::Provider(error)),
        Err(e) => Err(LessonDirError::Provider(format!(
            "Unreadable reply to {command:?}: {e}"
        ))),
    }
}

/// Remote backend backed by a provider binary.
///
/// Providers answer one request per process, so the lesson subscription is a
/// poll of `list_lessons` that only emits when the result changes.
pub struct ProviderBackend {
    provider: Provider,
    poll_interval: Duration,
}

impl ProviderBackend {
    pub fn new(provider: Provider, poll_interval: Duration) -> Self {
        ProviderBackend {
            provider,
            poll_interval,
        }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

struct Poll {
    provider: Provider,
    identity: SessionIdentity,
    period: Duration,
    ticker: Option<Interval>,
    last: Option<Vec<Lesson>>,
    done: bool,
}

impl Poll {
    /// Wait for the next tick and fetch; `None` when nothing changed.
    async fn next_change(&mut self) -> Option<LessonDirResult<Vec<Lesson>>> {
        let period = self.period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;

        let identity = self.identity.clone();
        match self.provider.call(ListLessons { identity }).await {
            Ok(mut lessons) => {
                lesson::sort_chronologically(&mut lessons);
                if self.last.as_ref() == Some(&lessons) {
                    return None;
                }
                debug!(count = lessons.len(), "Provider snapshot changed");
                self.last = Some(lessons.clone());
                Some(Ok(lessons))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[async_trait]
impl RemoteBackend for ProviderBackend {
    fn subscribe(&self, identity: &SessionIdentity) -> SnapshotStream {
        let poll = Poll {
            provider: self.provider.clone(),
            identity: identity.clone(),
            period: self.poll_interval,
            ticker: None,
            last: None,
            done: false,
        };

        stream::unfold(poll, |mut poll| async move {
            if poll.done {
                return None;
            }
            loop {
                if let Some(item) = poll.next_change().await {
                    return Some((item, poll));
                }
            }
        })
        .boxed()
    }

    async fn create_lesson(
        &self,
        identity: &SessionIdentity,
        draft: &LessonDraft,
    ) -> LessonDirResult<LessonId> {
        self.provider
            .call(CreateLesson {
                identity: identity.clone(),
                lesson: LessonDocument {
                    draft: draft.clone(),
                    owner: identity.clone(),
                },
            })
            .await
    }

    async fn update_lesson(
        &self,
        identity: &SessionIdentity,
        id: &str,
        changes: &LessonChanges,
    ) -> LessonDirResult<()> {
        self.provider
            .call(UpdateLesson {
                identity: identity.clone(),
                id: id.to_string(),
                changes: changes.clone(),
                owner: identity.clone(),
            })
            .await
    }

    async fn delete_lesson(&self, identity: &SessionIdentity, id: &str) -> LessonDirResult<()> {
        self.provider
            .call(DeleteLesson {
                identity: identity.clone(),
                id: id.to_string(),
            })
            .await
    }

    async fn load_students(&self, identity: &SessionIdentity) -> LessonDirResult<Vec<String>> {
        let doc = self
            .provider
            .call(LoadStudents {
                identity: identity.clone(),
            })
            .await?;
        Ok(doc.list)
    }

    async fn save_students(
        &self,
        identity: &SessionIdentity,
        students: &[String],
    ) -> LessonDirResult<()> {
        self.provider
            .call(SaveStudents {
                identity: identity.clone(),
                students: StudentsDocument {
                    list: students.to_vec(),
                },
            })
            .await
    }

    async fn load_rates(&self, identity: &SessionIdentity) -> LessonDirResult<RateMap> {
        let doc = self
            .provider
            .call(LoadRates {
                identity: identity.clone(),
            })
            .await?;
        Ok(doc.map)
    }

    async fn save_rates(&self, identity: &SessionIdentity, rates: &RateMap) -> LessonDirResult<()> {
        self.provider
            .call(SaveRates {
                identity: identity.clone(),
                rates: RatesDocument { map: rates.clone() },
            })
            .await
    }

    async fn load_settings(&self, identity: &SessionIdentity) -> LessonDirResult<Settings> {
        self.provider
            .call(LoadSettings {
                identity: identity.clone(),
            })
            .await
    }

    async fn save_settings(
        &self,
        identity: &SessionIdentity,
        settings: &Settings,
    ) -> LessonDirResult<()> {
        self.provider
            .call(SaveSettings {
                identity: identity.clone(),
                settings: settings.clone(),
            })
            .await
    }

    async fn list_templates(&self, identity: &SessionIdentity) -> LessonDirResult<Vec<Template>> {
        let mut templates = self
            .provider
            .call(ListTemplates {
                identity: identity.clone(),
            })
            .await?;
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn create_template(
        &self,
        identity: &SessionIdentity,
        template: &NewTemplate,
    ) -> LessonDirResult<Template> {
        self.provider
            .call(CreateTemplate {
                identity: identity.clone(),
                template: template.clone(),
            })
            .await
    }

    async fn delete_template(&self, identity: &SessionIdentity, id: &str) -> LessonDirResult<()> {
        self.provider
            .call(DeleteTemplate {
                identity: identity.clone(),
                id: id.to_string(),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_provider_binary() {
        let provider = Provider::from_name("definitely-not-installed-xyz");
        let result = provider
            .call(ListLessons {
                identity: SessionIdentity::new("uid"),
            })
            .await;
        assert!(matches!(result, Err(LessonDirError::ProviderNotInstalled(name))
            if name == "lessondir-provider-definitely-not-installed-xyz"));
    }

    #[tokio::test]
    async fn test_subscription_fails_and_ends_without_provider() {
        let backend = ProviderBackend::new(
            Provider::from_name("definitely-not-installed-xyz"),
            Duration::from_millis(10),
        );
        let mut feed = backend.subscribe(&SessionIdentity::new("uid"));

        assert!(matches!(feed.next().await, Some(Err(_))));
        assert!(feed.next().await.is_none());
    }

    #[test]
    fn test_decode_reply() {
        let lessons: Vec<Lesson> =
            decode_reply(Command::ListLessons, b"{\"status\":\"success\",\"data\":[]}\n").unwrap();
        assert!(lessons.is_empty());

        let err = decode_reply::<Vec<Lesson>>(
            Command::ListLessons,
            b"{\"status\":\"error\",\"error\":\"token expired\"}",
        )
        .unwrap_err();
        assert!(matches!(err, LessonDirError::Provider(msg) if msg == "token expired"));

        assert!(matches!(
            decode_reply::<Vec<Lesson>>(Command::ListLessons, b"  \n"),
            Err(LessonDirError::Provider(msg)) if msg == "No reply to ListLessons"
        ));
        assert!(decode_reply::<Vec<Lesson>>(Command::ListLessons, b"not json").is_err());
    }

    #[test]
    fn test_request_line_is_one_json_line() {
        let line = request_line(
            Command::DeleteLesson,
            DeleteLesson {
                identity: SessionIdentity::new("uid"),
                id: "l1".into(),
            },
        )
        .unwrap();

        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["command"], "delete_lesson");
        assert_eq!(value["params"]["id"], "l1");
    }
}

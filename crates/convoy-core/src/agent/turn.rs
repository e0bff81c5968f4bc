//! The turn loop behind `Agent::send` and `Agent::summarize`.
//!
//! Every append to the conversation store happens before the event that
//! announces it. Cancellation is checked between steps: partial text is
//! persisted, unanswered tool calls never reach history, and exactly one
//! `cancelled` event ends the turn.

use tokio_util::sync::CancellationToken;

use super::callbacks::StreamCallbacks;
use super::credential_retry::CredentialRecovery;
use super::executor::{self, ExecutionEnv};
use super::stream::{self, StreamOutcome};
use super::AgentInner;
use crate::ai::{Message, ModelRequest, Part, Role, ToolDefinition};
use crate::constants;
use crate::error::{AgentError, ModelError};
use crate::events::{AgentEvent, AgentEventKind, AuthEvent, AuthEventKind};
use crate::storage::SessionManager;

impl AgentInner {
    pub(super) async fn run_send(
        &self,
        session_id: &str,
        prompt: &str,
        callbacks: &StreamCallbacks,
        token: &CancellationToken,
    ) -> Result<String, AgentError> {
        match self.drive_send(session_id, prompt, callbacks, token).await {
            Ok(message_id) => Ok(message_id),
            Err(AgentError::Cancelled) => Err(AgentError::Cancelled),
            Err(e) => Err(self.report_failure(session_id, Some(callbacks), e)),
        }
    }

    pub(super) async fn run_summarize(
        &self,
        session_id: &str,
        token: &CancellationToken,
    ) -> Result<String, AgentError> {
        match self.drive_summarize(session_id, token).await {
            Ok(message_id) => Ok(message_id),
            Err(AgentError::Cancelled) => Err(AgentError::Cancelled),
            Err(e) => Err(self.report_failure(session_id, None, e)),
        }
    }

    async fn drive_send(
        &self,
        session_id: &str,
        prompt: &str,
        callbacks: &StreamCallbacks,
        token: &CancellationToken,
    ) -> Result<String, AgentError> {
        let session = self
            .store
            .ensure_session(session_id)
            .map_err(AgentError::store)?;
        if session.title.is_empty() {
            let title = SessionManager::generate_title_from_content(prompt);
            if !title.is_empty() {
                self.store
                    .update_title(session_id, &title)
                    .map_err(AgentError::store)?;
            }
        }

        self.append(Message::new(session_id, Role::User, vec![Part::text(prompt)]))?;

        let tool_definitions = self.tools.definitions();
        let max_turns = self.config.max_turns;

        for turn in 1..=max_turns {
            if token.is_cancelled() {
                return Err(self.finish_cancelled(session_id));
            }

            tracing::debug!(turn, "Starting model turn");
            let request = self.build_request(session_id, tool_definitions.clone())?;

            let mut on_text = |delta: &str| {
                callbacks.text(delta);
                self.publish(
                    session_id,
                    AgentEventKind::TextDelta {
                        delta: delta.to_string(),
                    },
                );
            };
            let mut outcome = self.model_turn(request, token, &mut on_text).await?;

            if outcome.cancelled {
                // Tool calls streamed before the cancel are dropped unanswered
                let parts = outcome.content_parts();
                if !parts.is_empty() {
                    self.append(Message::new(session_id, Role::Assistant, parts))?;
                }
                return Err(self.finish_cancelled(session_id));
            }

            if let Some(error) = outcome.error.take() {
                let parts = outcome.content_parts();
                if !parts.is_empty() {
                    self.store
                        .append_message(&Message::new(session_id, Role::Assistant, parts))
                        .map_err(|e| {
                            AgentError::store(e.context(format!(
                                "failed to keep partial reply after {}",
                                error
                            )))
                        })?;
                }
                return Err(AgentError::Model(error));
            }

            let mut parts = outcome.content_parts();
            parts.extend(outcome.tool_calls.iter().map(Part::tool_call));
            let assistant = Message::new(session_id, Role::Assistant, parts);
            self.append(assistant.clone())?;

            if outcome.tool_calls.is_empty() {
                callbacks.complete(&assistant);
                self.publish(
                    session_id,
                    AgentEventKind::Complete {
                        message_id: assistant.id.clone(),
                    },
                );
                tracing::info!(turns = turn, finish = ?outcome.finish, "Send complete");
                return Ok(assistant.id);
            }

            for call in &outcome.tool_calls {
                callbacks.tool_call(call);
                self.publish(session_id, AgentEventKind::ToolCall { call: call.clone() });
            }

            let env = ExecutionEnv {
                tools: &self.tools,
                hub: &self.hub,
                summaries: &self.summaries,
                session_id,
                token,
                max_output_chars: self.config.max_tool_output_chars,
                parallel: self.config.parallel_tool_calls,
            };
            let batch = executor::execute_tools(&env, &outcome.tool_calls).await;

            let results = batch.executions.iter().map(|e| e.to_part()).collect();
            self.append(Message::new(session_id, Role::Tool, results))?;

            for execution in &batch.executions {
                callbacks.tool_result(&execution.call, &execution.output);
                self.publish(
                    session_id,
                    AgentEventKind::ToolResult {
                        call_id: execution.call.id.clone(),
                        name: execution.call.name.clone(),
                        content: execution.output.content.clone(),
                        is_error: execution.output.is_error,
                    },
                );
            }

            if batch.cancelled {
                return Err(self.finish_cancelled(session_id));
            }
        }

        Err(AgentError::MaxTurnsExceeded(max_turns))
    }

    async fn drive_summarize(
        &self,
        session_id: &str,
        token: &CancellationToken,
    ) -> Result<String, AgentError> {
        if self
            .store
            .get_session(session_id)
            .map_err(AgentError::store)?
            .is_none()
        {
            return Err(AgentError::store(anyhow::anyhow!(
                "Session not found: {}",
                session_id
            )));
        }

        let mut request = self.build_request(session_id, Vec::new())?;
        request.messages.push(Message::new(
            session_id,
            Role::User,
            vec![Part::text(constants::agent::SUMMARY_PROMPT)],
        ));

        let outcome = self.model_turn(request, token, &mut |_: &str| {}).await?;
        if outcome.cancelled {
            return Err(self.finish_cancelled(session_id));
        }
        if let Some(error) = outcome.error {
            return Err(AgentError::Model(error));
        }
        // The pointer only moves to a summary that says something
        if outcome.text.trim().is_empty() {
            return Err(AgentError::EmptySummary);
        }

        let summary = Message::new(session_id, Role::Assistant, vec![Part::text(outcome.text)]);
        self.append(summary.clone())?;
        self.store
            .set_summary_message(session_id, &summary.id)
            .map_err(AgentError::store)?;

        self.publish(
            session_id,
            AgentEventKind::Summarized {
                message_id: summary.id.clone(),
            },
        );
        tracing::info!(message_id = %summary.id, "Session summarized");
        Ok(summary.id)
    }

    /// One model call, retried once after a credential refresh when the
    /// first attempt is rejected for authentication before producing output.
    async fn model_turn(
        &self,
        request: ModelRequest,
        token: &CancellationToken,
        on_text: &mut (dyn FnMut(&str) + Send),
    ) -> Result<StreamOutcome, AgentError> {
        let outcome = self.stream_once(request.clone(), token, on_text).await;
        if !outcome.is_retryable_auth_failure() {
            return Ok(outcome);
        }
        let Some(recovery) = &self.recovery else {
            return Ok(outcome);
        };

        tracing::warn!(
            provider = recovery.provider_id(),
            "Model rejected credential, refreshing once"
        );
        self.recover_credentials(recovery).await?;
        Ok(self.stream_once(request, token, on_text).await)
    }

    /// Open and drain one model stream while holding the model gate
    async fn stream_once(
        &self,
        request: ModelRequest,
        token: &CancellationToken,
        on_text: &mut (dyn FnMut(&str) + Send),
    ) -> StreamOutcome {
        // A queued set_model blocks new readers; stay responsive to cancel
        let model = tokio::select! {
            biased;
            _ = token.cancelled() => return StreamOutcome::cancelled(),
            model = self.model.read() => model,
        };
        let timeout = self.config.stream_timeout();
        tracing::debug!(
            model = model.model_id(),
            messages = request.messages.len(),
            "Calling model"
        );

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => return StreamOutcome::cancelled(),
            opened = tokio::time::timeout(timeout, model.stream(request)) => opened,
        };

        let model_stream = match opened {
            Ok(Ok(model_stream)) => model_stream,
            Ok(Err(e)) => {
                tracing::warn!(model = model.model_id(), "Model call failed: {}", e);
                return StreamOutcome::failed(e);
            }
            Err(_) => return StreamOutcome::failed(ModelError::Timeout(timeout.as_secs())),
        };

        stream::process_stream(model_stream, token, timeout, on_text).await
    }

    /// Refresh, persist, then swap. The swap never starts before the new
    /// credential is durable.
    async fn recover_credentials(&self, recovery: &CredentialRecovery) -> Result<(), AgentError> {
        let provider = recovery.provider_id();

        let refreshed = match recovery.refresh_and_persist().await {
            Ok(credential) => credential,
            Err(e) => return Err(self.refresh_failed(provider, e)),
        };

        let client = match recovery.build_client(&refreshed) {
            Ok(client) => client,
            Err(e) => return Err(self.refresh_failed(provider, e)),
        };
        self.swap_model(client).await;

        self.hub.publish_auth(AuthEvent::new(
            provider,
            AuthEventKind::Refreshed,
            refreshed.expires_at,
        ));
        tracing::info!(provider, "Credential refreshed and client swapped");
        Ok(())
    }

    fn refresh_failed(&self, provider: &str, error: anyhow::Error) -> AgentError {
        let message = format!("{:#}", error);
        tracing::error!(provider, "Credential refresh failed: {}", message);
        self.hub.publish_auth(
            AuthEvent::new(provider, AuthEventKind::RefreshFailed, None).with_message(&message),
        );
        AgentError::CredentialRefresh(message)
    }

    /// History for the next model call, starting at the summary if any
    fn build_request(
        &self,
        session_id: &str,
        tools: Vec<ToolDefinition>,
    ) -> Result<ModelRequest, AgentError> {
        let summary_id = self
            .store
            .get_session(session_id)
            .map_err(AgentError::store)?
            .and_then(|s| s.summary_message_id);
        let messages = self
            .store
            .list_messages(session_id)
            .map_err(AgentError::store)?;

        Ok(ModelRequest {
            system: self.config.system_prompt.clone(),
            messages: history_from_summary(messages, summary_id.as_deref()),
            tools,
        })
    }

    fn append(&self, message: Message) -> Result<(), AgentError> {
        self.store
            .append_message(&message)
            .map_err(AgentError::store)
    }

    fn publish(&self, session_id: &str, kind: AgentEventKind) {
        self.hub.publish_agent(AgentEvent::new(session_id, kind));
    }

    fn finish_cancelled(&self, session_id: &str) -> AgentError {
        tracing::info!("Turn cancelled");
        self.publish(session_id, AgentEventKind::Cancelled);
        AgentError::Cancelled
    }

    fn report_failure(
        &self,
        session_id: &str,
        callbacks: Option<&StreamCallbacks>,
        error: AgentError,
    ) -> AgentError {
        tracing::error!(session_id = %session_id, "Turn failed: {}", error);
        if let Some(callbacks) = callbacks {
            callbacks.error(&error);
        }
        self.publish(
            session_id,
            AgentEventKind::Error {
                error: error.to_string(),
            },
        );
        error
    }
}

/// Drop everything before the summary and present the summary as context
fn history_from_summary(mut messages: Vec<Message>, summary_id: Option<&str>) -> Vec<Message> {
    let Some(summary_id) = summary_id else {
        return messages;
    };
    let Some(start) = messages.iter().position(|m| m.id == summary_id) else {
        return messages;
    };

    let mut history = messages.split_off(start);
    if let Some(summary) = history.first_mut() {
        let text = summary.text();
        summary.role = Role::User;
        summary.parts = vec![Part::text(format!(
            "Summary of the conversation so far:\n\n{}",
            text
        ))];
    }
    history
}

//! Hook Entry Points
//!
//! One facade the CLI commands call into. Each entry point takes the parsed
//! inbound document and returns the outbound decision document. Every error
//! path inside a flow resolves to the most conservative default (allow,
//! count zero, mode inactive): losing an enforcement signal is acceptable,
//! losing availability is not.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::backlog::{count_backlog, BacklogCount};
use crate::classify::{classify, synthesize, Mode, ModeMatch};
use crate::config::OmcConfig;
use crate::gate;
use crate::protocol::{HookInput, HookOutput};
use crate::restore;
use crate::state::{paths, FsStateStore, ModeState, StateDoc, StateStore};

pub struct HookApi {
    config: OmcConfig,
    home: Option<PathBuf>,
}

impl HookApi {
    pub fn new(config: OmcConfig) -> Self {
        Self {
            config,
            home: paths::home_dir(),
        }
    }

    /// Pin the home directory explicitly instead of resolving the platform
    /// default. Used by tests and respected everywhere a global path is built.
    pub fn with_home(config: OmcConfig, home: PathBuf) -> Self {
        Self {
            config,
            home: Some(home),
        }
    }

    pub fn config(&self) -> &OmcConfig {
        &self.config
    }

    fn project_root(&self, input: &HookInput) -> PathBuf {
        input
            .cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn global_store(&self) -> Option<FsStateStore> {
        self.home.as_deref().map(FsStateStore::global_at)
    }

    /// Classify a submitted prompt, persist activations, and synthesize the
    /// outbound instruction payload.
    pub fn on_prompt(&self, input: &HookInput) -> HookOutput {
        let raw = input.prompt.as_deref().unwrap_or("");
        if raw.trim().is_empty() {
            return HookOutput::allow();
        }

        let resolved = classify(raw);
        if resolved.is_empty() {
            return HookOutput::allow();
        }

        let project_root = self.project_root(input);
        let project = FsStateStore::project(&project_root);

        if resolved[0].mode == Mode::Cancel {
            project.clear();
            if let Some(global) = self.global_store() {
                global.clear();
            }
            tracing::info!("cancellation match: cleared mode state in both scopes");
            return HookOutput::allow_with_context(
                "All omc modes cancelled and mode state cleared.".to_string(),
            );
        }

        for matched in &resolved {
            if matched.mode.is_durable() {
                self.activate(&project, matched, raw, input.session_id.as_deref());
            }
        }

        match synthesize(&resolved) {
            Some(payload) => HookOutput::allow_with_context(payload),
            None => HookOutput::allow(),
        }
    }

    fn activate(
        &self,
        store: &FsStateStore,
        matched: &ModeMatch,
        raw_prompt: &str,
        session_id: Option<&str>,
    ) {
        let max_iterations = matched
            .arg
            .as_deref()
            .and_then(|arg| arg.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(self.config.max_iterations);
        let state = ModeState::activate(
            raw_prompt,
            session_id,
            max_iterations,
            &self.config.completion_promise,
        );
        store.write(matched.mode, &StateDoc::for_mode(matched.mode, state));
        tracing::info!(mode = matched.mode.name(), "mode activated");
    }

    /// Decide whether the agent may stop.
    pub fn on_stop(&self, input: &HookInput) -> HookOutput {
        let project_root = self.project_root(input);
        let project = FsStateStore::project(&project_root);
        let global = self.global_store();

        let loop_state = self.find_loop_state(&project, global.as_ref());
        let ultrawork = self.find_state(&project, global.as_ref(), Mode::Ultrawork);
        let backlog = self.backlog(input, &project_root);

        let decision = gate::evaluate(
            &input.stop_signal(),
            loop_state.as_ref().map(|(mode, doc, _)| (*mode, doc)),
            ultrawork.as_ref().map(|(doc, _)| doc),
            &backlog,
            Utc::now(),
        );

        if let Some(mutation) = decision.mutation {
            let scope = match mutation.mode {
                Mode::Ultrawork => ultrawork.as_ref().map(|(_, scope)| *scope),
                _ => loop_state.as_ref().map(|(_, _, scope)| *scope),
            };
            self.persist(&project, global.as_ref(), scope, mutation.mode, &mutation.doc);
        }

        match decision.verdict {
            gate::Verdict::Allow => HookOutput::allow(),
            gate::Verdict::Block(reason) => HookOutput::block(reason),
        }
    }

    /// Highest-priority active loop-type state, with the scope it came from.
    fn find_loop_state(
        &self,
        project: &FsStateStore,
        global: Option<&FsStateStore>,
    ) -> Option<(Mode, StateDoc, crate::state::Scope)> {
        for mode in Mode::LOOPS {
            if let Some((doc, scope)) = self.find_state(project, global, mode) {
                if doc.is_active() {
                    return Some((mode, doc, scope));
                }
            }
        }
        None
    }

    /// Read a mode's state, project scope first with global fallback.
    fn find_state(
        &self,
        project: &FsStateStore,
        global: Option<&FsStateStore>,
        mode: Mode,
    ) -> Option<(StateDoc, crate::state::Scope)> {
        if let Some(doc) = project.read(mode) {
            return Some((doc, project.scope()));
        }
        let global = global?;
        global.read(mode).map(|doc| (doc, global.scope()))
    }

    fn persist(
        &self,
        project: &FsStateStore,
        global: Option<&FsStateStore>,
        scope: Option<crate::state::Scope>,
        mode: Mode,
        doc: &StateDoc,
    ) {
        match scope {
            Some(crate::state::Scope::Global) => {
                if let Some(global) = global {
                    global.write(mode, doc);
                }
            }
            // Writes land at project scope unless the state was read from
            // the global store.
            _ => project.write(mode, doc),
        }
    }

    fn backlog(&self, input: &HookInput, project_root: &Path) -> BacklogCount {
        match self.home.as_deref() {
            Some(home) => count_backlog(home, project_root, input.session_id.as_deref()),
            None => BacklogCount::default(),
        }
    }

    /// Restore collaborator context and active modes at session start.
    pub fn on_session_start(&self, input: &HookInput) -> HookOutput {
        let project_root = self.project_root(input);
        let project = FsStateStore::project(&project_root);
        let global = self.global_store();

        let update = self.home.as_deref().map(restore::update_notice_source);
        let notepad = restore::priority_context_source(&project_root);

        let mut sources: Vec<&dyn restore::ContextSource> = Vec::new();
        if let Some(update) = update.as_ref() {
            sources.push(update);
        }
        sources.push(&notepad);

        let mut stores: Vec<&dyn StateStore> = vec![&project];
        if let Some(global) = global.as_ref() {
            stores.push(global);
        }

        match restore::session_context(&sources, &stores, input.session_id.as_deref()) {
            Some(context) => HookOutput::allow_with_context(context),
            None => HookOutput::allow(),
        }
    }
}

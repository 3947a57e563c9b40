//! Operator-facing run configuration and the conversational input state.

use std::collections::BTreeMap;

use crate::{
    config::{Config, TargetPreset},
    domain::ChatReference,
    errors::Error,
    Result,
};

/// Which field the next free-text message fills.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Awaiting {
    #[default]
    Idle,
    SourceRangeStart,
    SourceRangeEnd,
    TargetRangeStart(u8),
    TargetRangeEnd(u8),
}

/// What a consumed free-text message did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAccepted {
    SourceRangeStart,
    SourceRangeComplete,
    TargetRangeStart(u8),
    TargetRangeComplete(u8),
}

/// Range links are kept as typed; they are parsed when a run starts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkRange {
    pub first: Option<String>,
    pub last: Option<String>,
}

impl LinkRange {
    pub fn is_complete(&self) -> bool {
        self.first.is_some() && self.last.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetSpec {
    /// Channel whose posts are indexed.
    pub chat: Option<ChatReference>,
    /// Channel the matches are copied into.
    pub destination: Option<ChatReference>,
    pub range: LinkRange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunState {
    pub source: Option<ChatReference>,
    pub source_range: LinkRange,
    /// Keyed by 1-based target number; iteration order is the run order.
    pub targets: BTreeMap<u8, TargetSpec>,
    pub awaiting: Awaiting,
    max_targets: u8,
}

impl RunState {
    pub fn new(max_targets: u8) -> Self {
        Self {
            source: None,
            source_range: LinkRange::default(),
            targets: BTreeMap::new(),
            awaiting: Awaiting::Idle,
            max_targets: max_targets.max(1),
        }
    }

    /// Startup state: empty unless chat presets are configured.
    pub fn from_config(cfg: &Config) -> Self {
        let mut state = Self::new(cfg.max_targets);
        state.source = cfg.source_preset.clone();
        for TargetPreset {
            number,
            chat,
            destination,
        } in &cfg.target_presets
        {
            if *number == 0 || *number > state.max_targets {
                continue;
            }
            let spec = state.targets.entry(*number).or_default();
            spec.chat = chat.clone();
            spec.destination = destination.clone();
        }
        state
    }

    pub fn max_targets(&self) -> u8 {
        self.max_targets
    }

    /// Back to a fresh empty configuration, dropping any in-flight sequence.
    pub fn reset(&mut self) {
        *self = Self::new(self.max_targets);
    }

    pub fn set_source(&mut self, chat: ChatReference) {
        self.source = Some(chat);
    }

    pub fn set_target_chat(&mut self, number: u8, chat: ChatReference) -> Result<()> {
        self.target_mut(number)?.chat = Some(chat);
        Ok(())
    }

    pub fn set_destination(&mut self, number: u8, chat: ChatReference) -> Result<()> {
        self.target_mut(number)?.destination = Some(chat);
        Ok(())
    }

    /// Arm the source range sequence. The previous range is discarded.
    pub fn begin_source_range(&mut self) -> Result<()> {
        if self.source.is_none() {
            return Err(Error::ConfigurationIncomplete(vec![
                "source channel".to_string()
            ]));
        }
        self.source_range = LinkRange::default();
        self.awaiting = Awaiting::SourceRangeStart;
        Ok(())
    }

    /// Arm the range sequence for target `number`. Its previous range is discarded.
    pub fn begin_target_range(&mut self, number: u8) -> Result<()> {
        self.check_number(number)?;
        let spec = self
            .targets
            .get_mut(&number)
            .filter(|t| t.chat.is_some())
            .ok_or_else(|| {
                Error::ConfigurationIncomplete(vec![format!("target {number} channel")])
            })?;
        spec.range = LinkRange::default();
        self.awaiting = Awaiting::TargetRangeStart(number);
        Ok(())
    }

    /// Feed a free-text message. Returns `None` (and changes nothing) unless
    /// an input is armed.
    pub fn accept_text(&mut self, text: &str) -> Option<TextAccepted> {
        let text = text.trim().to_string();
        match self.awaiting {
            Awaiting::Idle => None,
            Awaiting::SourceRangeStart => {
                self.source_range.first = Some(text);
                self.awaiting = Awaiting::SourceRangeEnd;
                Some(TextAccepted::SourceRangeStart)
            }
            Awaiting::SourceRangeEnd => {
                self.source_range.last = Some(text);
                self.awaiting = Awaiting::Idle;
                Some(TextAccepted::SourceRangeComplete)
            }
            Awaiting::TargetRangeStart(n) => {
                self.targets.entry(n).or_default().range.first = Some(text);
                self.awaiting = Awaiting::TargetRangeEnd(n);
                Some(TextAccepted::TargetRangeStart(n))
            }
            Awaiting::TargetRangeEnd(n) => {
                self.targets.entry(n).or_default().range.last = Some(text);
                self.awaiting = Awaiting::Idle;
                Some(TextAccepted::TargetRangeComplete(n))
            }
        }
    }

    /// Human-readable names of everything a run still needs.
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.source.is_none() {
            missing.push("source channel".to_string());
        }
        if !self.source_range.is_complete() {
            missing.push("source range".to_string());
        }
        if self.targets.is_empty() {
            missing.push("at least one target".to_string());
        }
        for (n, t) in &self.targets {
            if t.chat.is_none() {
                missing.push(format!("target {n} channel"));
            }
            if t.destination.is_none() {
                missing.push(format!("target {n} destination"));
            }
            if !t.range.is_complete() {
                missing.push(format!("target {n} range"));
            }
        }
        missing
    }

    fn check_number(&self, number: u8) -> Result<()> {
        if number == 0 || number > self.max_targets {
            return Err(Error::Config(format!(
                "target number must be between 1 and {}",
                self.max_targets
            )));
        }
        Ok(())
    }

    fn target_mut(&mut self, number: u8) -> Result<&mut TargetSpec> {
        self.check_number(number)?;
        Ok(self.targets.entry(number).or_default())
    }
}

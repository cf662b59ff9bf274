//! Trigger kinds and the per-transition trigger settings of a popup.

use perch_core::Error;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The two transitions a popup makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Show,
    Hide,
}

impl Transition {
    pub fn name(self) -> &'static str {
        match self {
            Transition::Show => "show",
            Transition::Hide => "hide",
        }
    }
}

/// What user interaction starts a transition.
///
/// | Kind | Show | Hide |
/// |------|------|------|
/// | `click` | trigger clicked | active trigger clicked again |
/// | `over` | pointer enters a trigger | not allowed |
/// | `out` | not allowed | pointer left both trigger and layer |
/// | `blur` | not allowed | click outside layer and trigger |
/// | `context` | right click on a trigger | not allowed |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Click,
    Over,
    Out,
    Blur,
    Context,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 5] = [
        TriggerKind::Click,
        TriggerKind::Over,
        TriggerKind::Out,
        TriggerKind::Blur,
        TriggerKind::Context,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TriggerKind::Click => "click",
            TriggerKind::Over => "over",
            TriggerKind::Out => "out",
            TriggerKind::Blur => "blur",
            TriggerKind::Context => "context",
        }
    }

    pub fn supports(self, transition: Transition) -> bool {
        match transition {
            Transition::Show => matches!(
                self,
                TriggerKind::Click | TriggerKind::Over | TriggerKind::Context
            ),
            Transition::Hide => matches!(
                self,
                TriggerKind::Click | TriggerKind::Out | TriggerKind::Blur
            ),
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TriggerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        TriggerKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownTrigger(s.to_string()))
    }
}

/// Ordered, duplicate-free list of trigger kinds, written `"over,click"`.
/// An empty string gives an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSet(Vec<TriggerKind>);

impl TriggerSet {
    pub fn new(kinds: impl IntoIterator<Item = TriggerKind>) -> Self {
        let mut set = TriggerSet::default();
        for kind in kinds {
            if !set.0.contains(&kind) {
                set.0.push(kind);
            }
        }
        set
    }

    pub fn first(&self) -> Option<TriggerKind> {
        self.0.first().copied()
    }

    pub fn contains(&self, kind: TriggerKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TriggerKind> + '_ {
        self.0.iter().copied()
    }
}

impl FromStr for TriggerSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let kinds = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TriggerSet::new(kinds))
    }
}

impl fmt::Display for TriggerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.0.iter().map(|k| k.name()).collect();
        f.write_str(&names.join(","))
    }
}

/// The kinds that start one transition and the delay applied to the first
/// of them. Later kinds always act immediately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSpec {
    pub kinds: TriggerSet,
    pub delay: Duration,
}

impl TriggerSpec {
    /// Parse `kinds` and attach `delay`.
    pub fn parse(kinds: &str, delay: Duration) -> Result<Self, Error> {
        Ok(Self {
            kinds: kinds.parse()?,
            delay,
        })
    }

    pub fn new(kinds: impl IntoIterator<Item = TriggerKind>, delay: Duration) -> Self {
        Self {
            kinds: TriggerSet::new(kinds),
            delay,
        }
    }

    /// No triggers: the transition only happens through direct calls.
    pub fn manual() -> Self {
        Self::default()
    }

    pub fn delay_for(&self, kind: TriggerKind) -> Duration {
        if self.kinds.first() == Some(kind) {
            self.delay
        } else {
            Duration::ZERO
        }
    }

    /// Fail with [`Error::UnsupportedTrigger`] on a kind that cannot drive
    /// `transition`.
    pub fn validate(&self, transition: Transition) -> Result<(), Error> {
        match self.kinds.iter().find(|k| !k.supports(transition)) {
            Some(kind) => Err(Error::UnsupportedTrigger {
                kind: kind.name(),
                phase: transition.name(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_lists_in_order() {
        let set: TriggerSet = " over , click,over".parse().unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![TriggerKind::Over, TriggerKind::Click]);
        assert_eq!(set.to_string(), "over,click");
        assert!("".parse::<TriggerSet>().unwrap().is_empty());
    }

    #[test]
    fn unknown_kind_is_an_error() {
        assert_eq!(
            "hover".parse::<TriggerSet>(),
            Err(Error::UnknownTrigger("hover".into()))
        );
    }

    #[test]
    fn delay_applies_to_first_kind_only() {
        let spec = TriggerSpec::parse("out,blur", Duration::from_millis(200)).unwrap();
        assert_eq!(spec.delay_for(TriggerKind::Out), Duration::from_millis(200));
        assert_eq!(spec.delay_for(TriggerKind::Blur), Duration::ZERO);
    }

    #[test]
    fn validate_rejects_misplaced_kinds() {
        let spec = TriggerSpec::parse("over", Duration::ZERO).unwrap();
        assert!(spec.validate(Transition::Show).is_ok());
        assert_eq!(
            spec.validate(Transition::Hide),
            Err(Error::UnsupportedTrigger {
                kind: "over",
                phase: "hide"
            })
        );
        let spec = TriggerSpec::parse("blur", Duration::ZERO).unwrap();
        assert!(spec.validate(Transition::Show).is_err());
    }
}

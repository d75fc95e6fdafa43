//! Display Language and UI Strings
//!
//! The dashboard renders in English or Chinese. Strings are looked up through
//! a typed [`Message`] key so a missing translation is a compile error rather
//! than a blank cell.

use std::fmt;

/// Display language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    /// English.
    En,
    /// Simplified Chinese.
    #[default]
    Zh,
}

impl Language {
    /// Parse a language tag leniently (`zh`, `zh-CN`, `EN`, `en_US`, ...).
    ///
    /// Returns `None` for tags that match neither language.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let primary = tag
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();

        match primary.as_str() {
            "en" => Some(Self::En),
            "zh" | "cn" => Some(Self::Zh),
            _ => None,
        }
    }

    /// Language code persisted as the preference value.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }

    /// Pick the variant of a bilingual label.
    #[must_use]
    pub const fn pick(&self, label: &Label) -> &'static str {
        match self {
            Self::En => label.en,
            Self::Zh => label.zh,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A label with one spelling per language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    /// English text.
    pub en: &'static str,
    /// Chinese text.
    pub zh: &'static str,
}

impl Label {
    /// Create a label.
    #[must_use]
    pub const fn new(en: &'static str, zh: &'static str) -> Self {
        Self { en, zh }
    }
}

/// UI strings outside the per-column labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
    /// Row shown when a table section has no rows.
    NoData,
    /// Stream container text after a failed reasoning call.
    ReasoningFailed,
    /// Stream container text after a cancelled reasoning call.
    ReasoningCancelled,
    /// Reasoning section when no snapshot exists.
    NoReasoning,
    /// Insight/reasoning "generated at" caption.
    GeneratedAt,
    /// Reasoning model caption.
    Model,
    /// Reasoning bias caption.
    Bias,
    /// Reasoning confidence caption.
    Confidence,
    /// Reasoning summary caption.
    Summary,
    /// Reasoning key signals caption.
    KeySignals,
    /// Reasoning position suggestion caption.
    PositionSuggestion,
    /// Reasoning risks caption.
    Risks,
    /// Bullish bias.
    Bullish,
    /// Bearish bias.
    Bearish,
    /// Neutral bias.
    Neutral,
    /// Market insight section title.
    MarketInsight,
    /// Peripheral insight section title.
    PeripheralInsight,
    /// Macro insight section title.
    MacroInsight,
    /// Reasoning section title.
    Reasoning,
}

impl Message {
    const fn label(self) -> Label {
        match self {
            Self::NoData => Label::new("No data", "暂无数据"),
            Self::ReasoningFailed => Label::new(
                "Reasoning failed, please try again later.",
                "推理失败，请稍后重试。",
            ),
            Self::ReasoningCancelled => Label::new("Reasoning cancelled.", "推理已取消。"),
            Self::NoReasoning => Label::new("No reasoning generated yet", "暂无推理结果"),
            Self::GeneratedAt => Label::new("Generated at", "生成时间"),
            Self::Model => Label::new("Model", "模型"),
            Self::Bias => Label::new("Bias", "倾向"),
            Self::Confidence => Label::new("Confidence", "置信度"),
            Self::Summary => Label::new("Summary", "摘要"),
            Self::KeySignals => Label::new("Key signals", "关键信号"),
            Self::PositionSuggestion => Label::new("Position suggestion", "仓位建议"),
            Self::Risks => Label::new("Risks", "风险"),
            Self::Bullish => Label::new("Bullish", "看多"),
            Self::Bearish => Label::new("Bearish", "看空"),
            Self::Neutral => Label::new("Neutral", "中性"),
            Self::MarketInsight => Label::new("Market Insight", "市场洞察"),
            Self::PeripheralInsight => Label::new("Peripheral Markets", "外围市场"),
            Self::MacroInsight => Label::new("Macro Insight", "宏观洞察"),
            Self::Reasoning => Label::new("AI Reasoning", "AI 推理"),
        }
    }
}

/// The active language's dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Locale {
    language: Language,
}

impl Locale {
    /// Create a locale.
    #[must_use]
    pub const fn new(language: Language) -> Self {
        Self { language }
    }

    /// The active language.
    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    /// Look up a UI string.
    #[must_use]
    pub const fn text(&self, message: Message) -> &'static str {
        self.language.pick(&message.label())
    }

    /// Look up a bilingual label.
    #[must_use]
    pub const fn label(&self, label: &Label) -> &'static str {
        self.language.pick(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("en", Some(Language::En))]
    #[test_case("EN", Some(Language::En))]
    #[test_case("en_US", Some(Language::En))]
    #[test_case("zh", Some(Language::Zh))]
    #[test_case("zh-CN", Some(Language::Zh))]
    #[test_case(" zh ", Some(Language::Zh))]
    #[test_case("fr", None)]
    #[test_case("", None)]
    fn language_parsing(tag: &str, expected: Option<Language>) {
        assert_eq!(Language::parse(tag), expected);
    }

    #[test]
    fn code_round_trips() {
        for language in [Language::En, Language::Zh] {
            assert_eq!(Language::parse(language.code()), Some(language));
        }
    }

    #[test]
    fn locale_switches_text() {
        assert_eq!(Locale::new(Language::En).text(Message::NoData), "No data");
        assert_eq!(Locale::new(Language::Zh).text(Message::NoData), "暂无数据");
    }

    #[test]
    fn default_language_is_chinese() {
        assert_eq!(Locale::default().language(), Language::Zh);
    }
}

use libris_core::Intent;
use regex::Regex;

/// Model-free intent labelling from word lists.
///
/// Every intent whose pattern matches is reported, in the fixed order
/// recommend, savePreferences, saveReadBooks, talk. A message that matches
/// nothing is treated as small talk.
pub struct KeywordClassifier {
    patterns: Vec<(Regex, Intent)>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordClassifier {
    #[must_use]
    pub fn new() -> Self {
        let patterns = Self::default_patterns()
            .iter()
            .filter_map(|(intent, pattern)| Some((Regex::new(pattern).ok()?, *intent)))
            .collect();

        Self { patterns }
    }

    fn default_patterns() -> [(Intent, &'static str); 4] {
        [
            (
                Intent::Recommend,
                r"(?i)\b(recommend\w*|suggest\w*)\b",
            ),
            (
                Intent::SavePreferences,
                r"(?i)\b(like|likes|prefer\w*|enjoy\w*|favou?rites?|genres?)\b",
            ),
            (Intent::SaveReadBooks, r"(?i)\b(read|finished|completed)\b"),
            (Intent::Talk, r"(?i)\b(hello|hi|chat|talk|discuss)\b"),
        ]
    }

    #[must_use]
    pub fn classify(&self, text: &str) -> Vec<Intent> {
        let intents: Vec<Intent> = self
            .patterns
            .iter()
            .filter(|(re, _)| re.is_match(text))
            .map(|(_, intent)| *intent)
            .collect();

        if intents.is_empty() {
            vec![Intent::Talk]
        } else {
            intents
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_word_list() {
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.classify("Can you suggest a novel?"), vec![Intent::Recommend]);
        assert_eq!(
            classifier.classify("My favorite genre is horror"),
            vec![Intent::SavePreferences]
        );
        assert_eq!(
            classifier.classify("I finished Dune yesterday"),
            vec![Intent::SaveReadBooks]
        );
        assert_eq!(classifier.classify("Hello there"), vec![Intent::Talk]);
    }

    #[test]
    fn reports_every_match_in_fixed_order() {
        let classifier = KeywordClassifier::new();
        assert_eq!(
            classifier.classify("I read Emma and I enjoy classics, recommend more"),
            vec![
                Intent::Recommend,
                Intent::SavePreferences,
                Intent::SaveReadBooks
            ]
        );
    }

    #[test]
    fn unmatched_text_is_talk() {
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.classify("Hmm."), vec![Intent::Talk]);
        assert_eq!(classifier.classify("threaded"), vec![Intent::Talk]);
    }
}

use std::collections::HashMap;

const MAX_KEYWORDS: usize = 10;

/// Contraction and possessive endings split off a word before it is
/// judged, so "Andy's" counts as "andy".
const CLITICS: [&str; 7] = ["n't", "'s", "'re", "'ve", "'ll", "'d", "'m"];

// Standard English stopword list (as shipped with NLTK).
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Top ten most frequent non-stopword tokens of `text`, lowercased.
/// Ties keep the order in which tokens first appeared.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for raw in text.split_whitespace() {
        let token = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .replace('\u{2019}', "'")
            .to_lowercase();
        let token = strip_clitic(&token);
        if token.is_empty() || !token.chars().all(char::is_alphanumeric) {
            continue;
        }
        if STOPWORDS.contains(&token) {
            continue;
        }
        let count = counts.entry(token.to_string()).or_insert(0);
        if *count == 0 {
            order.push(token.to_string());
        }
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|token| {
            let count = counts[&token];
            (token, count)
        })
        .collect();
    // stable: equal counts stay in first-seen order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().take(MAX_KEYWORDS).map(|(token, _)| token).collect()
}

fn strip_clitic(token: &str) -> &str {
    CLITICS
        .iter()
        .find_map(|clitic| token.strip_suffix(clitic).filter(|stem| !stem.is_empty()))
        .unwrap_or(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_repeated_token_is_kept() {
        let plot = "A banker is sent to prison. In prison the banker befriends a smuggler \
                    and plans an escape from prison.";
        let keywords = extract_keywords(plot);
        assert_eq!(keywords[0], "prison");
        assert_eq!(keywords[1], "banker");
        assert!(!keywords.iter().any(|k| k == "the" || k == "a" || k == "from"));
    }

    #[test]
    fn at_most_ten_keywords() {
        let plot = "alpha bravo charlie delta echo foxtrot golf hotel india juliett kilo lima";
        let keywords = extract_keywords(plot);
        assert_eq!(keywords.len(), 10);
        assert_eq!(keywords.first().map(String::as_str), Some("alpha"));
        assert_eq!(keywords.last().map(String::as_str), Some("juliett"));
    }

    #[test]
    fn punctuation_only_and_hyphenated_tokens_are_dropped() {
        let keywords = extract_keywords("-- well-known Mob boss, mob... ");
        assert_eq!(keywords, vec!["mob".to_string(), "boss".to_string()]);
    }

    #[test]
    fn possessives_count_toward_the_name() {
        let keywords =
            extract_keywords("Andy's escape. Andy's friend Red helps Andy\u{2019}s plan.");
        assert_eq!(keywords[0], "andy");
        assert!(keywords.contains(&"red".to_string()));
        assert!(!keywords.iter().any(|k| k.contains('\'')));
    }

    #[test]
    fn contractions_keep_their_stem() {
        let keywords = extract_keywords("Wardens couldn't stop Red; they're warders who'd quit.");
        assert!(keywords.contains(&"wardens".to_string()));
        assert!(keywords.contains(&"quit".to_string()));
        assert!(!keywords.iter().any(|k| k == "couldn" || k == "they" || k == "who"));
    }

    #[test]
    fn empty_text_has_no_keywords() {
        assert!(extract_keywords("   ").is_empty());
    }
}

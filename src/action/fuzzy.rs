//! 名称模糊匹配（TAKE / LOOK / GO TO 共用）
//!
//! 得分：完全相等 3 > 互相包含 2 > 共享词 1；同分取候选列表中靠前者（即世界报告的顺序）。

const ARTICLES: [&str; 3] = ["the ", "a ", "an "];

fn normalize(s: &str) -> String {
    let mut s = s.trim().to_lowercase();
    for article in ARTICLES {
        if let Some(rest) = s.strip_prefix(article) {
            s = rest.trim().to_string();
            break;
        }
    }
    s
}

/// 匹配得分；None 表示不匹配
pub fn score(query: &str, candidate: &str) -> Option<u8> {
    let q = normalize(query);
    let c = normalize(candidate);
    if q.is_empty() || c.is_empty() {
        return None;
    }
    if q == c {
        return Some(3);
    }
    if c.contains(&q) || q.contains(&c) {
        return Some(2);
    }
    let shared = q
        .split_whitespace()
        .filter(|w| w.chars().count() >= 3)
        .any(|w| c.split_whitespace().any(|cw| cw == w));
    shared.then_some(1)
}

/// 在候选中选出最佳匹配
pub fn best_match<'a, T>(query: &str, items: &'a [T], name: impl Fn(&T) -> &str) -> Option<&'a T> {
    let mut best: Option<(u8, &T)> = None;
    for item in items {
        if let Some(s) = score(query, name(item)) {
            if best.map_or(true, |(b, _)| s > b) {
                best = Some((s, item));
            }
        }
    }
    best.map(|(_, item)| item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores() {
        assert_eq!(score("The Lamp", "lamp"), Some(3));
        assert_eq!(score("key", "brass key"), Some(2));
        assert_eq!(score("rusty brass thing", "brass key"), Some(1));
        assert_eq!(score("sofa", "lamp"), None);
        assert_eq!(score("", "lamp"), None);
    }

    #[test]
    fn test_best_match_prefers_higher_score_then_order() {
        let names = ["brass key", "key", "old key"];
        assert_eq!(best_match("key", &names, |n| n), Some(&"key"));
        assert_eq!(best_match("ke", &names, |n| n), Some(&"brass key"));
        assert_eq!(best_match("spoon", &names, |n| n), None);
    }
}

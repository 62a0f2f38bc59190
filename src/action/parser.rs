//! ActionParser：Oracle 原始文本 -> Action
//!
//! 查找以字面量 `Action:` 开头的第一行（允许行首空白），随后是大小写不敏感的关键字与参数。
//! 全函数：缺少标记、未知关键字或参数不合法时返回 Action::Invalid（原样保留原始文本），从不 panic。
//! 纯函数：相同输入总是得到相同 Action。

use std::sync::OnceLock;

use regex::Regex;

use crate::action::{Action, LookTarget};
use crate::world::Direction;

static ACTION_LINE_RE: OnceLock<Regex> = OnceLock::new();

fn action_line_re() -> &'static Regex {
    ACTION_LINE_RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*Action:[ \t]*(.*?)[ \t]*\r?$").unwrap())
}

/// 解析 Oracle 输出
pub fn parse_action(raw: &str) -> Action {
    let Some(caps) = action_line_re().captures(raw) else {
        return Action::Invalid(raw.to_string());
    };
    let body = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    parse_body(body).unwrap_or_else(|| Action::Invalid(raw.to_string()))
}

fn parse_body(body: &str) -> Option<Action> {
    let (keyword, rest) = match body.split_once(char::is_whitespace) {
        Some((k, r)) => (k, r.trim()),
        None => (body, ""),
    };
    match keyword.to_ascii_uppercase().as_str() {
        "GO" => parse_go(rest),
        "TAKE" => non_empty(clean_arg(rest)).map(Action::Take),
        "LOOK" => Some(parse_look(rest)),
        "SPEAK" => non_empty(unquote(rest)).map(Action::Speak),
        "ANNOUNCE" => non_empty(unquote(rest)).map(Action::Announce),
        "WAIT" => Some(Action::Wait),
        _ => None,
    }
}

fn parse_go(rest: &str) -> Option<Action> {
    let arg = clean_arg(rest);
    if let Some(dir) = Direction::parse(&arg) {
        return Some(Action::Go(dir));
    }
    let (first, target) = arg.split_once(char::is_whitespace)?;
    if first.eq_ignore_ascii_case("to") {
        non_empty(clean_arg(target)).map(Action::GoTo)
    } else {
        None
    }
}

fn parse_look(rest: &str) -> Action {
    let arg = clean_arg(rest);
    if arg.is_empty() {
        return Action::Look(None);
    }
    if let Some(dir) = Direction::parse(&arg) {
        return Action::Look(Some(LookTarget::Direction(dir)));
    }
    // 单独的 "at" 视为无目标
    let name = match arg.split_once(char::is_whitespace) {
        Some((first, tail)) if first.eq_ignore_ascii_case("at") => clean_arg(tail),
        None if arg.eq_ignore_ascii_case("at") => String::new(),
        _ => arg,
    };
    if name.is_empty() {
        Action::Look(None)
    } else {
        Action::Look(Some(LookTarget::Name(name)))
    }
}

/// 去掉包裹的引号/反引号与结尾句号
fn clean_arg(s: &str) -> String {
    let s = unquote(s.trim().trim_end_matches('.'));
    s.trim_end_matches('.').trim().to_string()
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('`', '`'), ('“', '”')] {
        if s.len() >= 2 && s.starts_with(open) && s.ends_with(close) {
            let inner = &s[open.len_utf8()..s.len() - close.len_utf8()];
            return inner.trim().to_string();
        }
    }
    s.to_string()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

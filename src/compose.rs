use std::{collections::BTreeMap, time::Duration};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use crate::error::ConfigError;

/// Query parameters keyed by name; each name may carry several values.
pub(crate) type QueryParams = BTreeMap<String, Vec<String>>;

const TIMEOUT_PARAM: &str = "timeout";

/// Characters escaped in a template argument so it stays inside one path
/// segment and reaches the server with its bytes intact.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Builds the absolute URL for one attempt.
///
/// The sub-path is joined onto the base path with a single `/`. The base
/// URL's own query is replaced by `params`, emitted in key order, plus a
/// `timeout` entry when `timeout` is non-zero.
pub(crate) fn compose_url(
    base_url: &str,
    sub_path: &str,
    sub_path_args: &[String],
    params: &QueryParams,
    timeout: Option<Duration>,
) -> Result<Url, ConfigError> {
    let mut url = Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
        url: base_url.to_owned(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::CannotBeABase(base_url.to_owned()));
    }

    let sub_path = if sub_path_args.is_empty() {
        sub_path.to_owned()
    } else {
        render_template(sub_path, sub_path_args)?
    };
    if !sub_path.is_empty() {
        let path = format!("{}/{}", url.path().trim_end_matches('/'), sub_path);
        url.set_path(&path);
    }

    url.set_query(None);
    let timeout = timeout.filter(|timeout| !timeout.is_zero());
    let mut query: Vec<(&str, String)> = params
        .iter()
        .filter(|(name, _)| timeout.is_none() || name.as_str() != TIMEOUT_PARAM)
        .flat_map(|(name, values)| values.iter().map(move |value| (name.as_str(), value.clone())))
        .collect();
    if let Some(timeout) = timeout {
        query.push((TIMEOUT_PARAM, format_timeout(timeout)));
        query.sort_by(|left, right| left.0.cmp(right.0));
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    Ok(url)
}

/// Renders `%`-verbs positionally: `%` followed by an ASCII letter takes the
/// next argument, percent-encoded as a path segment; `%%` is a literal `%`.
pub(crate) fn render_template(template: &str, args: &[String]) -> Result<String, ConfigError> {
    let mut rendered = String::with_capacity(template.len());
    let mut args_iter = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            rendered.push(ch);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                rendered.push('%');
            }
            Some(verb) if verb.is_ascii_alphabetic() => {
                chars.next();
                let arg = args_iter.next().ok_or_else(|| ConfigError::SubPathTemplate {
                    template: template.to_owned(),
                    reason: format!("missing argument for %{verb}"),
                })?;
                rendered.extend(utf8_percent_encode(arg, SEGMENT));
            }
            _ => rendered.push('%'),
        }
    }

    let extra = args_iter.count();
    if extra > 0 {
        return Err(ConfigError::SubPathTemplate {
            template: template.to_owned(),
            reason: format!("{extra} unused argument(s)"),
        });
    }
    Ok(rendered)
}

/// Human readable duration, e.g. `5s`, `1.5s`, `250ms`.
pub(crate) fn format_timeout(timeout: Duration) -> String {
    format!("{timeout:?}")
}

/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Rendering of authorized-keys stanzas.

use crate::config::AppConfig;
use crate::models::PublicKey;

/// First line of every stanza this crate writes. The line after it is the
/// stanza's key entry.
pub const MARKER: &str = "# gitea public key";

const RESTRICTIONS: &str =
    "no-port-forwarding,no-X11-forwarding,no-agent-forwarding,no-pty,no-user-rc,restrict";

fn is_special(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t'
            | '\n'
            | '\r'
            | '!'
            | '"'
            | '#'
            | '$'
            | '&'
            | '\''
            | '('
            | ')'
            | '*'
            | ';'
            | '<'
            | '>'
            | '?'
            | '['
            | '\\'
            | ']'
            | '^'
            | '`'
            | '{'
            | '|'
            | '}'
            | '~'
    )
}

/// Quote `value` for a POSIX shell.
///
/// Values without shell metacharacters are returned unchanged. Values
/// containing `!` or a newline are single quoted, anything else is double
/// quoted.
pub fn shell_escape(value: &str) -> String {
    if !value.chars().any(is_special) {
        return value.to_string();
    }

    if value.contains('!') || value.contains('\n') {
        return format!("'{}'", value.replace('\'', "'\\''"));
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '`' | '"' | '$' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Expand the forced-command template for `key`.
pub fn render_command(template: &str, app: &AppConfig, key: &PublicKey) -> String {
    template
        .replace("{{.AppPath}}", &shell_escape(&app.app_path))
        .replace("{{.AppWorkPath}}", &shell_escape(&app.work_path))
        .replace("{{.CustomConf}}", &shell_escape(&app.custom_conf))
        .replace("{{.CustomPath}}", &shell_escape(&app.custom_path))
        .replace("{{.Key.ID}}", &key.id.to_string())
}

/// The two-line stanza for `key`, newline terminated.
pub fn authorized_string(template: &str, app: &AppConfig, key: &PublicKey) -> String {
    let command = render_command(template, app, key);
    format!(
        "{}\ncommand={},{} {}\n",
        MARKER,
        shell_escape(&command),
        RESTRICTIONS,
        key.content.trim()
    )
}

//! GN command lines
//!
//! Builds argv vectors for the GN binary and renders command lines for
//! echoing the way the host shell would need them quoted.

use crate::paths::{Platform, SourceTree, SOURCE_ROOT_PREFIX};

/// The GN binary for a checkout
#[derive(Debug, Clone)]
pub struct GnTool {
    binary: String,
}

impl GnTool {
    /// GN under `buildtools/<platform>/`, unless `gn_path` overrides it.
    pub fn for_tree(tree: &SourceTree, gn_path: Option<&str>) -> Self {
        let binary = match gn_path {
            Some(path) if path.starts_with(SOURCE_ROOT_PREFIX) => tree.to_abs(path).display().to_string(),
            Some(path) => path.to_string(),
            None => {
                let (subdir, exe) = tree.platform().gn_binary();
                tree.render_under_root(&["buildtools", subdir, exe])
            }
        };
        Self { binary }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// `gn <subcommand> <path> <args...>`
    pub fn command(&self, subcommand: &str, path: &str, args: &[&str]) -> Vec<String> {
        let mut cmd = vec![self.binary.clone(), subcommand.to_string(), path.to_string()];
        cmd.extend(args.iter().map(|a| a.to_string()));
        cmd
    }

    pub fn gen(&self, build_dir: &str, check: bool) -> Vec<String> {
        if check {
            self.command("gen", build_dir, &["--check"])
        } else {
            self.command("gen", build_dir, &[])
        }
    }

    pub fn desc_runtime_deps(&self, build_dir: &str, label: &str) -> Vec<String> {
        self.command("desc", build_dir, &[label, "runtime_deps"])
    }

    pub fn analyze(&self, build_dir: &str, input: &str, output: &str) -> Vec<String> {
        self.command("analyze", build_dir, &[input, output])
    }
}

/// Render `cmd` as a single line a user could paste into the platform's
/// shell.
pub fn format_command(platform: Platform, cmd: &[String]) -> String {
    let quote = if platform.is_win() { quote_for_cmd } else { quote_for_sh };
    cmd.iter().map(|arg| quote(arg)).collect::<Vec<_>>().join(" ")
}

fn quote_for_sh(arg: &str) -> String {
    let safe = |c: char| c.is_alphanumeric() || "_@%+=:,./-".contains(c);
    if !arg.is_empty() && arg.chars().all(safe) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', "'\"'\"'"))
}

const UNSAFE_FOR_CMD: &str = "^<>&|()%";

fn quote_for_cmd(arg: &str) -> String {
    let mut quoted = if arg.is_empty() || arg.contains(' ') || arg.contains('"') {
        // Backslashes directly before a quote are doubled, then the quote
        // itself is escaped, matching CommandLineToArgvW.
        let mut out = String::from("\"");
        let mut backslashes = 0;
        for c in arg.chars() {
            match c {
                '\\' => backslashes += 1,
                '"' => {
                    out.push_str(&"\\".repeat(backslashes * 2));
                    out.push_str("\\\"");
                    backslashes = 0;
                }
                _ => {
                    out.push_str(&"\\".repeat(backslashes));
                    out.push(c);
                    backslashes = 0;
                }
            }
        }
        out.push_str(&"\\".repeat(backslashes));
        out.push('"');
        out
    } else {
        arg.to_string()
    };

    if quoted.chars().any(|c| UNSAFE_FOR_CMD.contains(c)) {
        quoted = quoted
            .chars()
            .flat_map(|c| {
                let caret = UNSAFE_FOR_CMD.contains(c) || c == '"';
                caret.then_some('^').into_iter().chain(std::iter::once(c))
            })
            .collect();
    }
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_default_binary_per_platform() {
        let linux = SourceTree::new("/fake_src", Platform::Linux);
        assert_eq!(GnTool::for_tree(&linux, None).binary(), "/fake_src/buildtools/linux64/gn");

        let win = SourceTree::new("c:\\fake_src", Platform::Win);
        assert_eq!(GnTool::for_tree(&win, None).binary(), "c:\\fake_src\\buildtools\\win\\gn.exe");
    }

    #[test]
    fn test_gn_path_override() {
        let tree = SourceTree::new("/fake_src", Platform::Linux);
        assert_eq!(GnTool::for_tree(&tree, Some("/usr/bin/gn")).binary(), "/usr/bin/gn");
        assert_eq!(
            GnTool::for_tree(&tree, Some("//third_party/gn/gn")).binary(),
            "/fake_src/third_party/gn/gn"
        );
    }

    #[test]
    fn test_commands() {
        let tree = SourceTree::new("/fake_src", Platform::Linux);
        let gn = GnTool::for_tree(&tree, None);

        assert_eq!(
            format_command(Platform::Linux, &gn.gen("//out/Default", true)),
            "/fake_src/buildtools/linux64/gn gen //out/Default --check"
        );
        assert_eq!(
            gn.desc_runtime_deps("//out/Default", "//base:base_unittests"),
            cmd(&["/fake_src/buildtools/linux64/gn", "desc", "//out/Default", "//base:base_unittests", "runtime_deps"])
        );
        assert_eq!(gn.analyze("//out/Default", "/tmp/in.json.gn", "/tmp/out.json.gn")[1], "analyze");
    }

    #[test]
    fn test_sh_quoting() {
        assert_eq!(
            format_command(Platform::Linux, &cmd(&["echo", "a b", "it's", ""])),
            "echo 'a b' 'it'\"'\"'s' ''"
        );
    }

    #[test]
    fn test_cmd_quoting() {
        assert_eq!(format_command(Platform::Win, &cmd(&["gn.exe", "gen", "//out/Debug"])), "gn.exe gen //out/Debug");
        assert_eq!(format_command(Platform::Win, &cmd(&["a b"])), "\"a b\"");
        assert_eq!(format_command(Platform::Win, &cmd(&["a&b"])), "a^&b");
        assert_eq!(format_command(Platform::Win, &cmd(&["say \"hi\""])), "\"say \\\"hi\\\"\"");
    }
}

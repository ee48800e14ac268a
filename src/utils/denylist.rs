/// Commit messages too generic to be worth a similarity search: each of these
/// matches thousands of unrelated repositories and burns search-API budget
/// for zero signal. Tunable data, not logic; biased toward English with a few
/// CJK and Spanish entries that showed up in past investigations.
pub static POPULAR_COMMIT_MESSAGES: &[&str] = &[
    // Build and CI related
    "ci: update workflow",
    "update ci",
    "fix pipeline",
    "update actions",
    "update workflow",
    "update ci/cd",
    // Dependencies
    "build(deps): bump",
    "chore(deps)",
    "update dependencies",
    "deps: update",
    "upgrade dependencies",
    "npm update",
    "yarn upgrade",
    "update packages",
    // Common development tasks
    "wip: initial implementation",
    "work in progress",
    "todo: implement",
    "draft: initial version",
    "temp commit",
    "checkpoint",
    "save progress",
    "backup",
    // Documentation
    "docs: update",
    "update docs",
    "fix documentation",
    "update changelog.md",
    "update contributing.md",
    "update license",
    // Common fix messages
    "hotfix",
    "quickfix",
    "minor fix",
    "patch",
    "bugfix",
    "fix: typo",
    "fix build",
    "fix error",
    "fix warning",
    "fix lint",
    // Clean up
    "clean up code",
    "code cleanup",
    "remove unused",
    "delete old files",
    "formatting",
    "format code",
    // Feature related
    "initial implementation",
    "add feature",
    "implement",
    "new feature",
    // Configuration
    "update config",
    "config: update",
    "update settings",
    "update env",
    "update docker",
    "update k8s",
    // Testing
    "add tests",
    "update tests",
    "fix failing tests",
    "test: add",
    "test: update",
    // Version control
    "merge develop",
    "merge master",
    "merge main",
    "merge branch",
    "resolve conflicts",
    "cherry-pick",
    "rebase",
    // Release related
    "bump version",
    "release v",
    "prepare release",
    "update version",
    // Style and UI
    "style: fix",
    "update styles",
    "ui: update",
    "css updates",
    "design changes",
    // Common non-English
    "更新",           // Update (Chinese/Japanese)
    "修复",           // Fix (Chinese)
    "初始化",         // Initialize (Chinese)
    "修正",           // Fix (Japanese)
    "変更",           // Change (Japanese)
    "actualización", // Update (Spanish)
    "corrección",    // Fix (Spanish)
    // Top results from investigations
    "MIT LICENSE",
    "README.md",
    "README...",
    "Upload",
    "Update README.md",
    "Initial commit",
    "fake commit",
    "Add files via upload",
    "update",
    "Create README.md",
    "first commit",
    "🔁 Update README",
    "- update README.md",
    "initial commit",
    "Update readme.md",
    "Update index.html",
    "Update changelog",
    "- add README.md",
    "commit",
    "update readme",
    "Refactor",
    "fix",
    "Update",
    "- update .github/workflows/build.yml",
    "- update .github/workflows/build-mingw.yml",
    "Update README.",
    ".",
    "init",
    "Updates",
    "...",
    "Initialize project using Create React App",
    "➕ Add Image 🖼",
    "🔁 Edit HTML",
    "Update github-metrics.svg - [Skip GitHub Action]",
    "- upload files",
    "update changelog",
    "updated",
    "updated readme",
    "Regenerate build artifacts.",
    "design",
    "Create LICENSE",
    "🔄 Update README",
    "cleanup",
    "- update .github/workflows/push.yml",
    "Update style.css",
    "create file",
    "Merge branch 'master' into master",
    "readme",
    "Update readme",
    "- add .github/workflows/build.yml",
    "test",
    "- init",
    "Initial commit from Create Next App",
    "🔁 Refactoring",
    "Update package.json",
    "Merge remote-tracking branch 'origin/master'",
    "Update schema",
    "Update README",
    "add dist",
    "- update index.html",
    "Update tools",
    "fix typo",
    "Initial Commit",
    "changes",
    "Update generated files",
    "プロジェクト ファイルを追加します。",
    "Update diagrams.xml",
    "fixes",
    "Update version",
    "Fix typo",
    "version bump",
    "Fix linters",
    "Merge branch 'main' into main",
    "- update Dockerfile",
    "wip",
    "Update Readme.md",
    "changed",
    "Updated README",
    "⬆️ Init",
    "lint",
    "Fix tests",
    "init, working",
    "Commit",
    "changed the code",
    "update README",
    "Update .gitignore",
    "bug fixes",
    "fix tests",
    "modified",
    "Update dependencies",
    "sync",
    "Update requirements.txt",
    "initial",
    "final",
];

/// Exact-match test against the denylist, after trimming surrounding
/// whitespace. A one-character variant of a listed message still qualifies
/// for search.
pub fn is_popular_message(message: &str) -> bool {
    let trimmed = message.trim();
    POPULAR_COMMIT_MESSAGES.iter().any(|m| *m == trimmed)
}

//! Prompt construction.

use url::Url;

/// File the llms.txt agent is told to write, relative to its workspace.
pub const LLMS_TXT_FILE: &str = "llms.txt";

/// Most source files quoted in an llms.txt prompt.
pub const MAX_PROMPT_FILES: usize = 10;

/// Each quoted file is cut to this many characters.
pub const MAX_PROMPT_FILE_CHARS: usize = 800;

pub const LLMS_TXT_SYSTEM_SUFFIX: &str = "

CRITICAL INSTRUCTIONS FOR THIS SESSION:
- You are running in an automated environment with no human interaction
- DO NOT ask clarifying questions or present options
- Work autonomously with the information provided
- When writing llms.txt, include ONLY the brand guideline markdown content
- DO NOT include system messages, tool outputs, or meta-commentary in the file
- Extract actual values from the files provided - no placeholders
- Complete the task fully before ending the session";

/// Prompt for a browsing task, optionally anchored to a start page.
pub fn task_prompt(task: &str, url: Option<&Url>) -> String {
  match url {
    Some(url) => format!("Navigate to {} and then: {}", url, task),
    None => task.to_string(),
  }
}

/// Prompt asking the agent to write an llms.txt brand guide for `domain`
/// from the given `(name, content)` files.
pub fn llms_txt_prompt(domain: &str, files: &[(String, String)]) -> String {
  let listing = files
    .iter()
    .take(MAX_PROMPT_FILES)
    .map(|(name, content)| format!("**{}**:\n{}\n", name, truncate_chars(content, MAX_PROMPT_FILE_CHARS)))
    .collect::<Vec<_>>()
    .join("\n");

  format!(
    r#"SYSTEM CONTEXT: You are running in an automated VM environment. DO NOT ask questions or wait for user input. Work autonomously until the task is complete.

TASK: Generate an llms.txt file for {domain} following the llms.txt specification from llmstxt.org.

**Files from the key-value store ({count} total)**:
{listing}

**llms.txt FORMAT**:

The file MUST follow this structure in exact order:

1. **H1 heading** (required): Brand/project name
2. **Blockquote** (required): Concise summary with key brand information
3. **Detailed content sections** (optional): Markdown sections explaining brand guidelines WITHOUT H2 headings
4. **H2 "Optional" section** (optional): Secondary information that can be omitted for shorter context

**REQUIRED OUTPUT FORMAT**:
```markdown
# {{Brand Name}}

> Concise one-line summary of the brand's design identity and purpose

This is the design system and brand guidelines for {domain}. [2-3 clear sentences about the brand, its visual identity, and design principles.]

**Brand Overview**: [Brand personality and positioning]

**Design Principles**: [Core design values and approach]

**Color Palette**:
- Primary: #XXXXXX (RGB: X, X, X) - [Usage and meaning]
- Secondary: #XXXXXX (RGB: X, X, X) - [Usage and meaning]
- Accent: #XXXXXX (RGB: X, X, X) - [Usage and meaning]
[List ALL colors found in files with actual hex values]

**Typography**:
- Primary: [Font Family], weights: [list]
- Secondary: [Font Family], weights: [list]
- Heading styles: [specifications]
- Body styles: [specifications]

**Spacing & Layout**: [Spacing tokens, grid system, breakpoints]

**Component Patterns**: [Buttons, cards, forms, navigation]

**Design Tokens**: [CSS variables, border radius, shadows, animations]

## Optional

**Technical Implementation**: [Framework details, browser support, build tools]

**Additional Resources**: [Links to detailed documentation if available]
```

**CRITICAL INSTRUCTIONS**:
1. Follow the llms.txt format EXACTLY: H1, blockquote, then content
2. Use concise, clear language throughout
3. Extract ACTUAL values from the files, no placeholders like #XXXXXX
4. The blockquote MUST be a single-line summary
5. Main content should NOT use H2 headings except for "Optional"
6. Use bold markdown (**text**) and lists for structure instead of headings
7. Use the Write tool to create ./{file} in the current working directory
8. DO NOT include meta-commentary, system messages, or tool outputs in the file

Start working now. Analyze the files and write {file}."#,
    domain = domain,
    count = files.len(),
    listing = listing,
    file = LLMS_TXT_FILE,
  )
}

fn truncate_chars(value: &str, max: usize) -> &str {
  match value.char_indices().nth(max) {
    Some((end, _)) => &value[..end],
    None => value,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_task_prompt() {
    assert_eq!(task_prompt("list the fonts", None), "list the fonts");

    let url = Url::parse("https://example.com").unwrap();
    assert_eq!(
      task_prompt("list the fonts", Some(&url)),
      "Navigate to https://example.com/ and then: list the fonts"
    );
  }

  #[test]
  fn test_llms_txt_prompt_limits_files() {
    let files: Vec<(String, String)> = (0..12)
      .map(|i| (format!("file-{:02}.json", i), "x".repeat(1000)))
      .collect();

    let prompt = llms_txt_prompt("example.com", &files);

    assert!(prompt.contains("(12 total)"));
    assert!(prompt.contains("**file-09.json**"));
    assert!(!prompt.contains("**file-10.json**"));
    assert!(prompt.contains(&format!("{}\n", "x".repeat(800))));
    assert!(!prompt.contains(&"x".repeat(801)));
    assert!(prompt.contains("# {Brand Name}"));
  }

  #[test]
  fn test_truncate_respects_char_boundaries() {
    assert_eq!(truncate_chars("héllo", 2), "hé");
    assert_eq!(truncate_chars("hi", 10), "hi");
  }
}

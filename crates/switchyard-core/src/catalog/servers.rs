//! The server catalog seeded into a fresh registry.

use crate::domain::{LaunchSpec, ServerCategory, ServerDescriptor};

fn builtin(id: &str, name: &str, description: &str) -> ServerDescriptor {
    ServerDescriptor::new(
        id,
        name,
        LaunchSpec::new(
            "docker",
            [
                "run".to_string(),
                "-i".to_string(),
                "--rm".to_string(),
                format!("mcp/{id}"),
            ],
        ),
    )
    .with_description(description)
    .with_category(ServerCategory::Builtin)
    .with_recommended(true)
    .as_builtin()
}

fn gateway(id: &str, name: &str, description: &str, launch: LaunchSpec) -> ServerDescriptor {
    ServerDescriptor::new(id, name, launch)
        .with_description(description)
        .with_category(ServerCategory::Gateway)
}

fn credentialed(id: &str, name: &str, description: &str, package: &str) -> ServerDescriptor {
    ServerDescriptor::new(id, name, LaunchSpec::new("npx", ["-y", package]))
        .with_description(description)
        .with_category(ServerCategory::AuthRequired)
        .with_credentials(true)
}

/// All catalog servers, in declaration order.
pub fn builtin_servers() -> Vec<ServerDescriptor> {
    vec![
        builtin("time", "Time", "Current time and timezone conversion"),
        builtin("fetch", "Fetch", "Fetch web pages and convert them to markdown"),
        builtin("git", "Git", "Read, search and manipulate git repositories"),
        builtin("memory", "Memory", "Persistent knowledge graph memory"),
        builtin(
            "sequentialthinking",
            "Sequential Thinking",
            "Step-by-step problem solving",
        ),
        gateway(
            "filesystem",
            "Filesystem",
            "File system operations for the workspace (read-only)",
            LaunchSpec::new(
                "npx",
                ["-y", "@modelcontextprotocol/server-filesystem", "/workspace"],
            ),
        )
        .with_recommended(true),
        gateway(
            "context7",
            "Context7",
            "Up-to-date library documentation lookup",
            LaunchSpec::new("npx", ["-y", "@upstash/context7-mcp"]),
        )
        .with_recommended(true),
        gateway(
            "serena",
            "Serena",
            "Semantic code navigation and editing",
            LaunchSpec::new(
                "docker",
                [
                    "run",
                    "--rm",
                    "-i",
                    "ghcr.io/oraios/serena:latest",
                    "serena",
                    "start-mcp-server",
                    "--context",
                    "ide-assistant",
                ],
            ),
        )
        .with_recommended(true),
        gateway(
            "mindbase",
            "Mindbase",
            "Long-term conversation memory",
            LaunchSpec::new("node", ["servers/mindbase/dist/index.js"]),
        )
        .with_recommended(true),
        gateway(
            "self-management",
            "Self Management",
            "Enable and disable gateway servers from a client",
            LaunchSpec::new("node", ["servers/self-management/dist/index.js"]),
        )
        .with_recommended(true),
        gateway(
            "puppeteer",
            "Puppeteer",
            "Browser automation and web scraping",
            LaunchSpec::new("npx", ["-y", "@modelcontextprotocol/server-puppeteer"]),
        ),
        gateway(
            "sqlite",
            "SQLite",
            "SQLite database operations",
            LaunchSpec::new(
                "npx",
                ["-y", "mcp-server-sqlite", "--db-path", "/app/data.db"],
            ),
        ),
        credentialed(
            "tavily",
            "Tavily",
            "AI-powered web search and research",
            "@tavily/mcp-server",
        )
        .with_recommended(true),
        credentialed("stripe", "Stripe", "Stripe payment processing", "@stripe/mcp"),
        credentialed("figma", "Figma", "Figma design integration", "@hapins/figma-mcp"),
        credentialed(
            "supabase",
            "Supabase",
            "Supabase backend operations",
            "@supabase/mcp-server-supabase",
        )
        .with_recommended(true),
        credentialed(
            "slack",
            "Slack",
            "Slack messaging and collaboration",
            "@modelcontextprotocol/server-slack",
        ),
        credentialed(
            "github",
            "GitHub",
            "GitHub repository operations",
            "@modelcontextprotocol/server-github",
        )
        .with_recommended(true),
        credentialed("notion", "Notion", "Notion workspace integration", "@notionhq/mcp-server"),
        credentialed(
            "brave-search",
            "Brave Search",
            "Brave search engine integration",
            "@modelcontextprotocol/server-brave-search",
        ),
        credentialed(
            "sentry",
            "Sentry",
            "Sentry error tracking and monitoring",
            "@modelcontextprotocol/server-sentry",
        ),
        credentialed("twilio", "Twilio", "Twilio messaging and voice", "@twilio-alpha/mcp"),
        credentialed("mongodb", "MongoDB", "MongoDB database operations", "@mongodb/mcp-server"),
        ServerDescriptor::new(
            "mcp-postgres-server",
            "PostgreSQL",
            LaunchSpec::new(
                "npx",
                ["-y", "mcp-postgres-server", "--dsn", "${POSTGRES_CONNECTION_STRING}"],
            ),
        )
        .with_description("PostgreSQL database operations")
        .with_category(ServerCategory::AuthRequired)
        .with_credentials(true),
    ]
}

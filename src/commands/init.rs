use std::io::{self, Write};
use std::path::Path;

use crate::config::Config;
use crate::error::{JiraError, Result};

/// Print `message` and read one trimmed line from stdin.
fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

pub fn run(path: Option<&Path>) -> Result<()> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };

    if config_path.exists() {
        let answer = prompt(&format!(
            "Config file already exists at {}. Overwrite? [y/N] ",
            config_path.display()
        ))?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("jiraclient configuration");
    println!("========================\n");

    let url = prompt("Jira URL (e.g., https://jira.example.com): ")?;
    if url.is_empty() {
        return Err(JiraError::MissingUrl);
    }
    let user = prompt("Jira user: ")?;
    if user.is_empty() {
        return Err(JiraError::MissingUser);
    }
    let project = prompt("Default project key (e.g., INFOSYS) [optional]: ")?;
    let project = Some(project.as_str()).filter(|p| !p.is_empty());

    write_config(&config_path, &Config::skeleton(&url, &user, project))?;

    println!("\nConfig saved to {}", config_path.display());
    println!("The password is asked for on first login unless set in the file or JIRA_PASSWORD.");
    Ok(())
}

fn write_config(path: &Path, contents: &str) -> Result<()> {
    let io_err = |source| JiraError::ConfigRead {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, contents).map_err(io_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(io_err)?;
    }
    Ok(())
}

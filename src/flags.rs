use crate::error::ShellError;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Flags {
    flags: HashMap<String, Flag>,
}

#[derive(Debug, Clone)]
pub struct Flag {
    pub short: Option<String>,
    pub long: String,
    pub description: String,
    pub takes_value: bool,
    pub value: Option<String>,
}

impl Default for Flags {
    fn default() -> Self {
        Self::new()
    }
}

impl Flags {
    pub fn new() -> Self {
        let mut flags = HashMap::new();
        let mut add = |name: &str, short: Option<&str>, description: &str, takes_value: bool| {
            flags.insert(
                name.to_string(),
                Flag {
                    short: short.map(str::to_string),
                    long: format!("--{}", name),
                    description: description.to_string(),
                    takes_value,
                    value: None,
                },
            );
        };

        add("help", Some("-h"), "Print this help message", false);
        add("version", Some("-v"), "Show version information", false);
        add("config", Some("-c"), "Read only this rc file", true);
        add("quiet", Some("-q"), "Skip the startup banner", false);
        add("debug", Some("-d"), "Log at debug level", false);
        add("no-catch", None, "Let plugin panics crash the shell", false);
        add("auth", None, "Start unverified until LOGIN", false);

        Flags { flags }
    }

    pub fn parse(&mut self, args: &[String]) -> Result<(), ShellError> {
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            let flag = self
                .flags
                .values_mut()
                .find(|flag| flag.short.as_deref() == Some(arg.as_str()) || &flag.long == arg)
                .ok_or_else(|| ShellError::FlagError(format!("Unknown flag {}", arg)))?;

            if flag.takes_value {
                let value = args.get(i + 1).ok_or_else(|| {
                    ShellError::FlagError(format!("Flag {} requires a value", arg))
                })?;
                flag.value = Some(value.clone());
                i += 1;
            } else {
                flag.value = Some("true".to_string());
            }
            i += 1;
        }
        Ok(())
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.flags
            .get(name)
            .and_then(|f| f.value.as_ref())
            .is_some()
    }

    pub fn get_value(&self, name: &str) -> Option<&String> {
        self.flags.get(name).and_then(|f| f.value.as_ref())
    }

    pub fn usage(&self) -> String {
        let mut flags: Vec<&Flag> = self.flags.values().collect();
        flags.sort_by(|a, b| a.long.cmp(&b.long));

        let mut out = String::from("Usage: conch [OPTIONS]\n\nOptions:\n");
        for flag in flags {
            let short = flag.short.as_deref().unwrap_or("  ");
            let long = if flag.takes_value {
                format!("{} <path>", flag.long)
            } else {
                flag.long.clone()
            };
            out.push_str(&format!("  {}, {:<18} {}\n", short, long, flag.description));
        }
        out
    }

    pub fn print_help(&self) {
        print!("{}", self.usage());
    }
}

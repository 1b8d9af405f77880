pub const DESCRIBE: &str = include_str!("../data/prompts/describe.txt");
pub const LENS: &str = include_str!("../data/prompts/lens.txt");
pub const STYLE: &str = include_str!("../data/prompts/style.txt");
pub const RESTYLE: &str = include_str!("../data/prompts/restyle.txt");
pub const BLEND: &str = include_str!("../data/prompts/blend.txt");
pub const MUTATE: &str = include_str!("../data/prompts/mutate.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result.trim_end().to_string()
}

//! Closed set of pipeline and report declarations

use serde_yaml::Value;

use crate::literal::Literal;
use crate::parser::Call;

/// A declaration found in a notebook cell
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `pipeline.add_deps_to_stage(stage, *deps)`
    AddDeps { stage: String, deps: Vec<String> },
    /// `pipeline.add_outs_to_stage(stage, *outs)`
    AddOuts { stage: String, outs: Vec<String> },
    /// `pipeline.link_params_to_stage(stage, *params)`
    LinkParams { stage: String, params: Vec<String> },
    /// `pipeline.set_wdir_to_stage(stage, wdir)`
    SetWdir { stage: String, wdir: String },
    /// `pipeline.add_params_to_stage(stage, {..})`
    AddParams { stage: String, params: Value },
    /// `pipeline.set_pipeline_stage(stage, notebook, output, {key: ref})`
    SetStage {
        stage: String,
        notebook: String,
        output: String,
        params: Vec<(String, String)>,
    },
    /// `report.add_text_to_report(text)`
    ReportText(String),
    /// `report.add_comment_to_report(text)`
    ReportComment(String),
    /// `report.add_img_to_report(link, alias="")`
    ReportImage { link: String, alias: String },
}

impl Directive {
    /// Stage the directive applies to, if any
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::AddDeps { stage, .. }
            | Self::AddOuts { stage, .. }
            | Self::LinkParams { stage, .. }
            | Self::SetWdir { stage, .. }
            | Self::AddParams { stage, .. }
            | Self::SetStage { stage, .. } => Some(stage),
            Self::ReportText(_) | Self::ReportComment(_) | Self::ReportImage { .. } => None,
        }
    }

    pub fn is_report(&self) -> bool {
        self.stage().is_none()
    }

    /// Maps a parsed call onto a directive
    pub fn from_call(call: Call) -> Result<Self, String> {
        let args = Arguments::new(&call);
        let directive = match (call.receiver.as_str(), call.method.as_str()) {
            ("pipeline", "add_deps_to_stage") => Self::AddDeps {
                stage: args.string(0, "stage")?,
                deps: args.rest_strings(1)?,
            },
            ("pipeline", "add_outs_to_stage") => Self::AddOuts {
                stage: args.string(0, "stage")?,
                outs: args.rest_strings(1)?,
            },
            ("pipeline", "link_params_to_stage") => Self::LinkParams {
                stage: args.string(0, "stage")?,
                params: args.rest_strings(1)?,
            },
            ("pipeline", "set_wdir_to_stage") => Self::SetWdir {
                stage: args.string(0, "stage")?,
                wdir: args.string(1, "wdir")?,
            },
            ("pipeline", "add_params_to_stage") => {
                let params = args.required(1, "params")?;
                if !matches!(params, Literal::Dict(_)) {
                    return Err(format!(
                        "add_params_to_stage expects a dict of parameters, got {}",
                        params.kind()
                    ));
                }
                Self::AddParams {
                    stage: args.string(0, "stage")?,
                    params: params.to_yaml(),
                }
            }
            ("pipeline", "set_pipeline_stage") => Self::SetStage {
                stage: args.string(0, "stage")?,
                notebook: args.string(1, "notebook_name")?,
                output: args.string(2, "output_name")?,
                params: args.string_dict(3, "params")?,
            },
            ("report", "add_text_to_report") => Self::ReportText(args.string(0, "text")?),
            ("report", "add_comment_to_report") => Self::ReportComment(args.string(0, "text")?),
            ("report", "add_img_to_report") => Self::ReportImage {
                link: args.string(0, "img_link")?,
                alias: args.optional_string(1, "alias")?.unwrap_or_default(),
            },
            (receiver, method) => {
                return Err(format!("unknown declaration {}.{}", receiver, method));
            }
        };
        Ok(directive)
    }
}

/// Positional-or-keyword argument lookup for one call
struct Arguments<'a> {
    method: &'a str,
    args: &'a [Literal],
    kwargs: &'a [(String, Literal)],
}

impl<'a> Arguments<'a> {
    fn new(call: &'a Call) -> Self {
        Self {
            method: &call.method,
            args: &call.args,
            kwargs: &call.kwargs,
        }
    }

    fn get(&self, index: usize, name: &str) -> Option<&'a Literal> {
        self.args.get(index).or_else(|| {
            self.kwargs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value)
        })
    }

    fn required(&self, index: usize, name: &str) -> Result<&'a Literal, String> {
        self.get(index, name)
            .ok_or_else(|| format!("{} is missing argument '{}'", self.method, name))
    }

    fn string(&self, index: usize, name: &str) -> Result<String, String> {
        let value = self.required(index, name)?;
        value.as_str().map(str::to_string).ok_or_else(|| {
            format!(
                "{} expects '{}' to be a string, got {}",
                self.method,
                name,
                value.kind()
            )
        })
    }

    fn optional_string(&self, index: usize, name: &str) -> Result<Option<String>, String> {
        match self.get(index, name) {
            None => Ok(None),
            Some(_) => self.string(index, name).map(Some),
        }
    }

    /// Variadic string arguments from `start` on; list arguments are flattened
    fn rest_strings(&self, start: usize) -> Result<Vec<String>, String> {
        let mut values = Vec::new();
        for value in self.args.iter().skip(start) {
            collect_strings(value, self.method, &mut values)?;
        }
        Ok(values)
    }

    fn string_dict(&self, index: usize, name: &str) -> Result<Vec<(String, String)>, String> {
        let Some(value) = self.get(index, name) else {
            return Ok(Vec::new());
        };
        let Literal::Dict(entries) = value else {
            return Err(format!(
                "{} expects '{}' to be a dict, got {}",
                self.method,
                name,
                value.kind()
            ));
        };
        entries
            .iter()
            .map(|(key, value)| match (key.as_str(), value.as_str()) {
                (Some(key), Some(value)) => Ok((key.to_string(), value.to_string())),
                _ => Err(format!(
                    "{} expects '{}' to map strings to strings",
                    self.method, name
                )),
            })
            .collect()
    }
}

fn collect_strings(value: &Literal, method: &str, out: &mut Vec<String>) -> Result<(), String> {
    match value {
        Literal::Str(s) => out.push(s.clone()),
        Literal::List(items) => {
            for item in items {
                collect_strings(item, method, out)?;
            }
        }
        other => {
            return Err(format!(
                "{} expects string arguments, got {}",
                method,
                other.kind()
            ));
        }
    }
    Ok(())
}

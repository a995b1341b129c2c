//! Operation - コーディネータが扱う操作の種類（ログとエラー表示用）

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Delete,
    Download,
    Search,
    Probe,
    SignIn,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Delete => "delete",
            Operation::Download => "download",
            Operation::Search => "search",
            Operation::Probe => "probe",
            Operation::SignIn => "sign in",
        };
        f.write_str(name)
    }
}

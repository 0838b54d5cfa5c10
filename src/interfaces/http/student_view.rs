use crate::domain::student::StudentRecord;

/// (label, column) pairs shown in the student table, in display order.
const PROFILE_FIELDS: [(&str, &str); 11] = [
    ("Recorded Date", "RecordedDate"),
    ("First Name", "shib_given"),
    ("Last Name", "shib_sn"),
    ("Email", "shib_mail"),
    ("Selected Semester", "selectedSemester"),
    ("College Status", "College Status"),
    ("GPA", "GPA"),
    ("Country of Origin", "countryOfOrigin"),
    ("SPEAK/TOEFL Score", "SPEAK andor TOEFLiBT"),
    ("Travel Plans", "Travel Plans"),
    ("Interests", "Interests"),
];

const PREFERENCE_FIELDS: [&str; 5] = [
    "studentPref1",
    "studentPref2",
    "studentPref3",
    "studentPref4",
    "studentPref5",
];

const STYLE: &str = "body { font-family: Arial, sans-serif; margin: 20px; }
        h1 { color: #333; }
        table { width: 100%; border-collapse: collapse; margin-top: 20px; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #f2f2f2; }
        tr:nth-child(even) { background-color: #f9f9f9; }";

pub const EMAIL_REQUIRED_HTML: &str = "<h3>Error: Email query parameter is required</h3>";
pub const NOT_FOUND_HTML: &str = "<h3>Student not found</h3>";
pub const READ_ERROR_HTML: &str = "<h3>Error reading student data</h3>";

pub fn render_student(student: &StudentRecord) -> String {
    let mut rows = String::new();
    for (label, column) in PROFILE_FIELDS {
        let value = student.non_empty(column).unwrap_or("N/A");
        rows.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>\n",
            label,
            escape_html(value)
        ));
    }

    let preferences: String = PREFERENCE_FIELDS
        .iter()
        .filter_map(|column| student.non_empty(column))
        .map(|pref| format!("<li>{}</li>", escape_html(pref)))
        .collect();
    rows.push_str(&format!(
        "<tr><th>Preferences</th><td><ul>{}</ul></td></tr>\n",
        preferences
    ));

    format!(
        "<html>\n<head>\n<title>Student Info</title>\n<style>\n{}\n</style>\n</head>\n<body>\n<h1>Student Information</h1>\n<table>\n{}</table>\n</body>\n</html>\n",
        STYLE, rows
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

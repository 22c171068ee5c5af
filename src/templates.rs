use std::sync::OnceLock;
use tera::Tera;

static TERA: OnceLock<Tera> = OnceLock::new();

const INDIVIDUAL: &str = r#"Design & Technology Report: {{ name }}
Class: {{ class_name }} | Period: {{ period }}

{{ name }} has shown {{ band_phrase }} in Design & Technology {{ period }}, with an average grade of {{ average }} out of 5. Attendance stands at {{ attendance }}% and behaviour has been {{ behaviour }}.

Recent work:
{% if recent %}{% for g in recent %}- {{ g.title }}: {{ g.grade }}/5 ({{ g.date }})
{% endfor %}{% else %}- No graded work has been recorded yet.
{% endif %}
Strengths:
{% for s in strengths %}- {{ s }}
{% endfor %}
Areas for development:
{% for s in improvements %}- {{ s }}
{% endfor %}
Next steps:
{% for s in next_steps %}- {{ s }}
{% endfor %}"#;

const PROGRESS: &str = r#"Progress Report: {{ name }} ({{ class_name }})

Over {{ period }}, {{ name }}'s work has been {{ band_label }}, averaging {{ average }} out of 5 across {{ count }} graded project{% if count != 1 %}s{% endif %}.{% if trend %} {{ trend }}{% endif %}

Most recent assessments:
{% if recent %}{% for g in recent %}- {{ g.date }}: {{ g.title }} scored {{ g.grade }}/5
{% endfor %}{% else %}- No assessments recorded.
{% endif %}
Attendance: {{ attendance }}% | Behaviour: {{ behaviour }}

Goals for the next period:
{% for s in goals %}- {{ s }}
{% endfor %}"#;

const PARENTS: &str = r#"Dear Parent/Carer,

We are pleased to share an update on {{ name }}'s progress in Design & Technology {{ period }}. {{ name }} has been {{ band_label }} and has achieved an average grade of {{ average }} out of 5.

{{ name }} particularly shines in these areas:
{% for s in strengths %}- {{ s }}
{% endfor %}
To support {{ name }} at home, you could encourage them to:
{% for s in next_steps %}- {{ s }}
{% endfor %}
{{ name }}'s attendance is {{ attendance }}% and their behaviour in lessons has been {{ behaviour }}.

Thank you for your continued support.
{{ class_name }} Design & Technology team"#;

const CLASS: &str = r#"Class Report: {{ class_name }}{% if year_group %} ({{ year_group }}){% endif %}
Period: {{ period }}

The class of {{ count }} pupil{% if count != 1 %}s{% endif %} achieved an average grade of {{ average }} out of 5, which is {{ band_label }} overall. Average attendance was {{ attendance }}%.

Grade distribution:
- Excellent (4 and above): {{ excellent }}
- Good (3 to 4): {{ good }}
- Developing (below 3): {{ developing }}
{% if top %}
Top performers:
{% for p in top %}- {{ p.name }} ({{ p.average }})
{% endfor %}{% endif %}{% if support %}
Pupils who would benefit from extra support:
{% for p in support %}- {{ p.name }} ({{ p.average }})
{% endfor %}{% endif %}
Focus for the next period:
{% for s in next_steps %}- {{ s }}
{% endfor %}"#;

pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        if let Err(e) = tera.add_raw_templates(vec![
            ("report/individual", INDIVIDUAL),
            ("report/progress", PROGRESS),
            ("report/parents", PARENTS),
            ("report/class", CLASS),
        ]) {
            tracing::error!("Failed to load report templates: {}", e);
        }
        tera
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_report_templates_load() {
        let names: Vec<&str> = get_tera().get_template_names().collect();
        for name in ["report/individual", "report/progress", "report/parents", "report/class"] {
            assert!(names.contains(&name), "missing {}", name);
        }
    }
}

//! Prompt construction for the three model-backed steps.
//!
//! The prompts are in Italian, matching the language of the documents they
//! constrain. Builders are pure functions so tests can assert on exact
//! inclusion/exclusion of the conditional clauses.

use crate::session::Period;

/// Default character budget for call-document context.
pub const MAX_CONTEXT_CHARS: usize = 30_000;

/// Truncate oversized context, marking the cut so the model knows the text is
/// partial.
fn truncate_context(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}\n\n[... testo troncato ...]")
}

/// Step 1: summarize the home university's call document.
pub fn call_summary(context: &str, max_chars: usize) -> String {
    let context = truncate_context(context, max_chars);
    format!(
        r#"Sei un assistente specializzato in programmi Erasmus.
Analizza il seguente testo estratto da un bando Erasmus e creane un riassunto conciso
evidenziando:
- Periodo di apertura del bando
- Requisiti principali (inclusi i requisiti linguistici)
- Scadenze importanti
- Processo di candidatura
- Se presente, il numero di CFU (crediti formativi universitari) minimi che lo studente deve guadagnare durante l'erasmus

Contesto estratto dal bando:
{context}
"#
    )
}

/// Step 2: extract every partner institution from one department section.
///
/// The model is told to copy field values verbatim and answer with a bare
/// JSON array; empty source fields become empty strings or null.
pub fn destinations(department: &str, period: Period, section: &str) -> String {
    format!(
        r#"Sei un assistente universitario esperto nell'analisi di bandi Erasmus.
Il tuo compito è analizzare la sezione specifica del dipartimento "{department}" fornita di seguito.
Considera il periodo "{period}" per filtrare le destinazioni. Se non ci sono info sul periodo ignoralo.

Estrai TUTTE le università partner elencate nella sezione, mantenendo ESATTAMENTE i campi come sono scritti nel file originale.

Per ogni università partner trovata, crea un oggetto JSON con i seguenti campi:
- "name": il nome dell'università estratto dal campo "NOME ISTITUZIONE"
- "codice_europeo": valore del campo "CODICE EUROPEO"
- "nome_istituzione": valore del campo "NOME ISTITUZIONE"
- "codice_area": valore del campo "CODICE AREA"
- "posti": valore del campo "POSTI"
- "durata_per_posto": valore del campo "DURATA PER POSTO"
- "livello": valore del campo "LIVELLO"
- "dettagli_livello": valore del campo "DETTAGLI LIVELLO"
- "requisiti_linguistici": valore del campo "REQUISITI LINGUISTICI"
- "description": una breve descrizione accattivante di 1-2 frasi sull'università

IMPORTANTE:
- Restituisci ESCLUSIVAMENTE un array JSON valido
- Non aggiungere testo, spiegazioni o commenti prima o dopo l'array
- Se un campo è vuoto nel file, inserisci una stringa vuota "" o null
- Se non trovi destinazioni per il dipartimento, restituisci un array vuoto: []
- Assicurati che il JSON sia sintatticamente corretto
- Mantieni i valori dei campi esattamente come appaiono nel file
- I campi devono corrispondere esattamente a quelli del file: CODICE EUROPEO | NOME ISTITUZIONE | CODICE AREA | DESCRIZIONE AREA ISCED | POSTI | DURATA PER POSTO | LIVELLO | DETTAGLI LIVELLO | REQUISITI LINGUISTICI | BLENDED | SHORT MOBILITY | BIP | CIRCLE U | SOTTO CONDIZIONE | NOTE PER GLI STUDENTI

Esempio di formato richiesto:
[
  {{
    "name": "UNIVERSIDAD DE BARCELONA",
    "codice_europeo": "E BARCELO01",
    "nome_istituzione": "UNIVERSIDAD DE BARCELONA",
    "codice_area": "0732",
    "posti": "2",
    "durata_per_posto": "5",
    "livello": "U",
    "dettagli_livello": "",
    "requisiti_linguistici": "Spanish B2",
    "description": "Prestigiosa università catalana con forti programmi in ingegneria civile."
  }}
]

--- SEZIONE DEL DIPARTIMENTO "{department}" ---
{section}
"#,
        period = period.as_str(),
    )
}

/// Step 3: match a study plan against a destination's course catalog.
///
/// The period-aware clauses appear only when a period is known; step 2 is
/// optional, so the prompt must read naturally without one.
pub fn exam_analysis(
    destination: &str,
    study_plan: &str,
    exam_text: &str,
    period: Option<Period>,
) -> String {
    let period_info = match period {
        Some(p) => format!("\n\n**PERIODO ERASMUS SELEZIONATO:** {}\n", p.label()),
        None => String::new(),
    };
    let period_instruction = if period.is_some() {
        "\n6. IMPORTANTE: Indica nel campo 'notes' degli esami se il corso è disponibile nel periodo selezionato dallo studente. Se il PDF degli esami specifica i periodi (Fall/Spring, Semester 1/2, ecc.), usa queste informazioni per segnalare la compatibilità temporale."
    } else {
        ""
    };
    let notes_suffix = if period.is_some() {
        " + indicazione del periodo se disponibile nel PDF (es: Disponibile in Fall Semester)"
    } else {
        ""
    };
    let reason_suffix = if period.is_some() {
        " + periodo se disponibile"
    } else {
        ""
    };
    let summary_suffix = if period.is_some() {
        " Menziona quanti degli esami trovati sono disponibili nel periodo selezionato."
    } else {
        ""
    };
    let period_directives = match period {
        Some(p) => format!(
            "\n- Dai priorità agli esami disponibili nel periodo {label} selezionato dallo studente\n- Nel riassunto finale, specifica esplicitamente quanti esami sono compatibili con il periodo {label}",
            label = p.label(),
        ),
        None => String::new(),
    };

    format!(
        r#"Sei un esperto consulente universitario specializzato in programmi Erasmus.
Il tuo compito è analizzare la compatibilità tra il piano di studi di uno studente
e gli esami disponibili presso un'università di destinazione Erasmus.

**PIANO DI STUDI DELLO STUDENTE:**
{study_plan}

**ESAMI DISPONIBILI PRESSO L'UNIVERSITÀ DI DESTINAZIONE ({destination}):**
{exam_text}
{period_info}
**ISTRUZIONI:**
1. Analizza il piano di studi dello studente per identificare gli esami
2. Trova corrispondenze tra esami dello studente e corsi dell'università di destinazione
3. Suggerisci esami aggiuntivi interessanti per il profilo dello studente
4. Calcola un punteggio di compatibilità complessivo (0-100)
5. Fornisci un riassunto dell'analisi{period_instruction}

**FORMATO DI RISPOSTA RICHIESTO (JSON):**
{{
    "matched_exams": [
        {{
            "student_exam": "Nome esame dello studente",
            "destination_course": "Nome corso di destinazione corrispondente",
            "compatibility": "alta",
            "credits_student": "6 CFU",
            "credits_destination": "6 ECTS",
            "notes": "Descrizione della corrispondenza{notes_suffix}"
        }}
    ],
    "suggested_exams": [
        {{
            "course_name": "Nome corso suggerito",
            "credits": "6 ECTS",
            "reason": "Motivo del suggerimento{reason_suffix}",
            "category": "Computer Science"
        }}
    ],
    "compatibility_score": 85.0,
    "analysis_summary": "Riassunto dettagliato dell'analisi di compatibilità...{summary_suffix}"
}}

IMPORTANTE:
- Restituisci SOLO il JSON, senza testo aggiuntivo prima o dopo
- Se non trovi corrispondenze, lascia gli array vuoti ma mantieni la struttura
- Il punteggio deve essere un numero tra 0 e 100{period_directives}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_summary_embeds_context() {
        let prompt = call_summary("testo del bando", MAX_CONTEXT_CHARS);
        assert!(prompt.contains("testo del bando"));
        assert!(!prompt.contains("testo troncato"));
    }

    #[test]
    fn oversized_context_is_truncated_with_marker() {
        let long = "x".repeat(100);
        let prompt = call_summary(&long, 50);
        assert!(prompt.contains("[... testo troncato ...]"));
        assert!(!prompt.contains(&long));
    }

    #[test]
    fn destinations_names_department_and_period() {
        let prompt = destinations("Dipartimento di Informatica", Period::Fall, "E BARCELO01 | ...");
        assert!(prompt.contains("Dipartimento di Informatica"));
        assert!(prompt.contains("il periodo \"fall\""));
        assert!(prompt.contains("E BARCELO01 | ..."));
        assert!(prompt.contains("ESCLUSIVAMENTE un array JSON"));
    }

    #[test]
    fn exam_analysis_with_period_carries_all_clauses() {
        let prompt = exam_analysis("TU DELFT", "piano", "catalogo", Some(Period::Spring));
        assert!(prompt.contains("PERIODO ERASMUS SELEZIONATO"));
        assert!(prompt.contains("primaverile (Spring)"));
        assert!(prompt.contains("6. IMPORTANTE"));
        assert!(prompt.contains("Dai priorità agli esami"));
        assert!(prompt.contains("quanti esami sono compatibili"));
    }

    #[test]
    fn exam_analysis_without_period_omits_all_clauses() {
        let prompt = exam_analysis("TU DELFT", "piano", "catalogo", None);
        assert!(!prompt.contains("PERIODO ERASMUS SELEZIONATO"));
        assert!(!prompt.contains("6. IMPORTANTE"));
        assert!(!prompt.contains("Dai priorità"));
        assert!(prompt.contains("5. Fornisci un riassunto dell'analisi"));
        assert!(prompt.contains("TU DELFT"));
    }
}

//! System prompt for the legal desk agent.

/// Returns the attorney persona the agent answers as.
pub fn attorney_system_prompt() -> String {
    "\
You are a seasoned insurance attorney AI agent, specializing in the complex \
landscape of healthcare insurance in the Indian context. You have access to a \
tool, which you will use to formulate answers, when given queries. Use the \
context given in these answers to formulate your final answer, make sure you \
cite well with statutes et cetera."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_sets_persona() {
        let prompt = attorney_system_prompt();
        assert!(prompt.contains("insurance attorney"));
        assert!(prompt.contains("cite"));
    }
}

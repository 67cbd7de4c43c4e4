use common::storage::types::query_result::QueryResult;

/// Joins the `pageContent` of every match, in the order the store returned them.
/// `None` when there are no matches.
pub fn build_context(result: &QueryResult) -> Option<String> {
    if result.is_empty() {
        return None;
    }

    let context = result
        .matches
        .iter()
        .filter_map(|m| m.page_content())
        .collect::<Vec<_>>()
        .join(" ");

    Some(context)
}

/// Prompt for "stuff"-style question answering: all retrieved context goes into one prompt.
pub fn create_stuff_prompt(context: &str, question: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
         {context}\n\n\
         Question: {question}\n\
         Helpful Answer:"
    )
}

/// Sanitizes uploaded question text with ammonia's whitelist.
///
/// Safe formatting tags (<b>, <i>, <p>) survive; <script> and <style>
/// are removed together with their content, as are event-handler attributes.
/// Plain text passes through, apart from entity-escaping of `<`, `>` and `&`.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

//! Hostlist notation as understood by Slurm: `node01,node02,node03,node07`
//! collapses to `node[01-03,07]`.

#[derive(Debug, PartialEq, Eq)]
struct Group<'a> {
    prefix: &'a str,
    suffix: &'a str,
    // zero-padded width, 0 when numbers are not padded
    width: usize,
    numbers: Vec<u64>,
}

enum Entry<'a> {
    Literal(&'a str),
    Group(usize),
}

/// Split a name around its last run of digits.
fn split_name(name: &str) -> Option<(&str, &str, &str)> {
    let end = name.rfind(|c: char| c.is_ascii_digit())? + 1;
    let start = name[..end]
        .rfind(|c: char| !c.is_ascii_digit())
        .map_or(0, |idx| idx + 1);
    Some((&name[..start], &name[start..end], &name[end..]))
}

/// Collapse names into a hostlist expression.
///
/// Names are sorted first; names sharing everything but their last number
/// (and its zero padding) share one bracketed range list.
pub fn collect<S: AsRef<str>>(names: &[S]) -> String {
    let mut names: Vec<&str> = names.iter().map(|name| name.as_ref()).collect();
    names.sort_unstable();
    names.dedup();

    let mut groups: Vec<Group> = Vec::new();
    // names without digits and groups, in order of first appearance
    let mut entries: Vec<Entry> = Vec::new();

    for name in names {
        let parsed = split_name(name).and_then(|(prefix, digits, suffix)| {
            let number = digits.parse::<u64>().ok()?;
            let width = if digits.len() > 1 && digits.starts_with('0') {
                digits.len()
            } else {
                0
            };
            Some((prefix, suffix, width, number))
        });

        let (prefix, suffix, width, number) = match parsed {
            Some(parsed) => parsed,
            None => {
                entries.push(Entry::Literal(name));
                continue;
            }
        };

        match groups
            .iter_mut()
            .find(|g| g.prefix == prefix && g.suffix == suffix && g.width == width)
        {
            Some(group) => group.numbers.push(number),
            None => {
                entries.push(Entry::Group(groups.len()));
                groups.push(Group {
                    prefix,
                    suffix,
                    width,
                    numbers: vec![number],
                });
            }
        }
    }

    entries
        .into_iter()
        .map(|entry| match entry {
            Entry::Literal(name) => name.to_string(),
            Entry::Group(idx) => render_group(&mut groups[idx]),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn render_group(group: &mut Group) -> String {
    group.numbers.sort_unstable();
    group.numbers.dedup();

    let width = group.width;
    let pad = |n: u64| format!("{:0width$}", n, width = width);

    if let [single] = group.numbers[..] {
        return format!("{}{}{}", group.prefix, pad(single), group.suffix);
    }

    let mut ranges: Vec<String> = Vec::new();
    let mut iter = group.numbers.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            ranges.push(pad(start));
        } else {
            ranges.push(format!("{}-{}", pad(start), pad(end)));
        }
    }

    format!("{}[{}]{}", group.prefix, ranges.join(","), group.suffix)
}

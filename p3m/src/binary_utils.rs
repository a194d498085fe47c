use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned};

pub fn null_terminated_prefix(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.is_empty() {
        return None;
    }
    bytes.splitn(2, |&b| b == 0).next()
}

pub fn parse_mut<'a, T: FromBytes + Unaligned>(bytes: &mut &'a [u8]) -> Option<&'a T> {
    LayoutVerified::<_, T>::new_unaligned_from_prefix(*bytes).map(|(res, remaining)| {
        *bytes = remaining;
        res.into_ref()
    })
}

pub fn parse_slice_mut<'a, T: FromBytes + Unaligned>(
    bytes: &mut &'a [u8],
    count: usize,
) -> Option<&'a [T]> {
    if count == 0 {
        return Some(&[]);
    }

    LayoutVerified::new_slice_unaligned_from_prefix(*bytes, count).map(|(res, remaining)| {
        *bytes = remaining;
        res.into_slice()
    })
}

pub fn take_mut<'a>(bytes: &mut &'a [u8], count: usize) -> Option<&'a [u8]> {
    if bytes.len() < count {
        return None;
    }
    let (taken, remaining) = bytes.split_at(count);
    *bytes = remaining;
    Some(taken)
}

pub fn write<T: AsBytes>(out: &mut Vec<u8>, record: &T) {
    out.extend_from_slice(record.as_bytes());
}

pub fn write_slice<T: AsBytes>(out: &mut Vec<u8>, records: &[T]) {
    out.extend_from_slice(records.as_bytes());
}
